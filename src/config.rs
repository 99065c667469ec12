//! Run configuration.
//!
//! Defaults live here; a `config.yaml` inside the persist dir can
//! override them, and CLI flags override both. The file is optional and
//! is never created implicitly.

use std::path::Path;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PERSIST_DIR: &str = "./vector_db";
pub const DEFAULT_MIN_CLUSTER_SIZE: usize = 2;
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.75;

const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";

const CONFIG_FILE: &str = "config.yaml";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Embedding model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Minimum points in a neighborhood for a cluster to form
    #[serde(default = "default_min_cluster_size")]
    pub min_cluster_size: usize,

    /// Cosine similarity at or above which two titles are neighbors
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            min_cluster_size: DEFAULT_MIN_CLUSTER_SIZE,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_min_cluster_size() -> usize {
    DEFAULT_MIN_CLUSTER_SIZE
}

fn default_similarity_threshold() -> f32 {
    DEFAULT_SIMILARITY_THRESHOLD
}

impl Config {
    /// Load `config.yaml` from the persist dir if present, otherwise the
    /// defaults. Validation fails fast so a bad value never reaches the
    /// pipeline.
    pub fn load(persist_dir: &Path) -> anyhow::Result<Self> {
        let path = persist_dir.join(CONFIG_FILE);

        let config = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_yml::from_str(&raw)
                .with_context(|| format!("malformed config at {}", path.display()))?
        } else {
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.model.trim().is_empty() {
            bail!("model must not be empty");
        }
        if self.min_cluster_size < 1 {
            bail!(
                "min_cluster_size must be at least 1, got {}",
                self.min_cluster_size
            );
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            bail!(
                "similarity_threshold must be within [0.0, 1.0], got {}",
                self.similarity_threshold
            );
        }
        Ok(())
    }
}
