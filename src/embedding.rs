//! Sentence-embedding model wrapper around fastembed.
//!
//! The model is loaded once and reused for the process lifetime. The first
//! run downloads the model files into `<persist_dir>/models/`; after that
//! no network access happens on the embedding path. Download or load
//! failures surface immediately — there is no retry here.

use std::path::Path;
use std::sync::Mutex;

use fastembed::{InitOptions, TextEmbedding};

/// Wraps fastembed's `TextEmbedding`. A Mutex is required because
/// fastembed's `embed()` takes `&mut self`; the model itself is never
/// mutated in a way observable to callers.
pub struct Embedder {
    model: Mutex<TextEmbedding>,
    model_name: String,
    dimensions: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("unknown embedding model '{0}'")]
    UnknownModel(String),
}

impl Embedder {
    /// Load (or download on first use) the named model, caching its files
    /// under `cache_dir/models/`.
    pub fn new(model_name: &str, cache_dir: &Path) -> Result<Self, EmbeddingError> {
        let model_enum = parse_model_name(model_name)?;

        let models_dir = cache_dir.join("models");
        std::fs::create_dir_all(&models_dir).map_err(|e| {
            EmbeddingError::ModelUnavailable(format!(
                "cannot create model cache directory {}: {e}",
                models_dir.display()
            ))
        })?;

        let options = InitOptions::new(model_enum)
            .with_cache_dir(models_dir)
            .with_show_download_progress(true);

        let mut model = TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::ModelUnavailable(e.to_string()))?;

        let dimensions = probe_dimensions(&mut model)?;

        log::info!("embedding model '{model_name}' ready ({dimensions} dimensions)");

        Ok(Self {
            model: Mutex::new(model),
            model_name: model_name.to_string(),
            dimensions,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed a batch of titles. Output is index-aligned with the input;
    /// an empty batch short-circuits to an empty result.
    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut model = self
            .model
            .lock()
            .map_err(|e| EmbeddingError::EmbeddingFailed(format!("model lock poisoned: {e}")))?;

        let embeddings = model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;

        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::EmbeddingFailed(format!(
                "model returned {} embeddings for {} inputs",
                embeddings.len(),
                texts.len()
            )));
        }

        Ok(embeddings)
    }

    /// Embed a single query string.
    pub fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut model = self
            .model
            .lock()
            .map_err(|e| EmbeddingError::EmbeddingFailed(format!("model lock poisoned: {e}")))?;

        let embeddings = model
            .embed(vec![text], None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;

        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::EmbeddingFailed("model returned no embedding".to_string()))
    }

    /// SHA-256 of the model name, stamped into the vector store header so a
    /// model swap invalidates previously stored vectors.
    pub fn model_id_hash(&self) -> [u8; 32] {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.model_name.as_bytes());
        hasher.finalize().into()
    }
}

fn parse_model_name(name: &str) -> Result<fastembed::EmbeddingModel, EmbeddingError> {
    match name.to_lowercase().as_str() {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "all-minilm-l6-v2-q" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2Q),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-small-en-v1.5-q" => Ok(fastembed::EmbeddingModel::BGESmallENV15Q),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "bge-base-en-v1.5-q" => Ok(fastembed::EmbeddingModel::BGEBaseENV15Q),
        _ => Err(EmbeddingError::UnknownModel(name.to_string())),
    }
}

fn probe_dimensions(model: &mut TextEmbedding) -> Result<usize, EmbeddingError> {
    let probe = model
        .embed(vec!["probe"], None)
        .map_err(|e| EmbeddingError::ModelUnavailable(format!("dimension probe failed: {e}")))?;

    probe
        .first()
        .map(|v| v.len())
        .ok_or_else(|| EmbeddingError::ModelUnavailable("model returned no embedding".to_string()))
}
