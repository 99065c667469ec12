//! Pipeline orchestration: embed, persist, cluster, name, assemble.
//!
//! `Categorizer` owns the lazily initialized engine state (embedding
//! model, vector index, storage) and exposes the two operations the CLI
//! surfaces: full-batch categorization and similarity search.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;

use crate::articles::Article;
use crate::cluster::{ClusterError, Dbscan, NOISE};
use crate::config::Config;
use crate::embedding::{Embedder, EmbeddingError};
use crate::naming;
use crate::store::{
    title_hash, IndexError, VectorIndex, VectorStorage, VectorStorageError, VECTORS_FILE,
};

/// A named group of articles.
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub category_id: u32,
    pub category_name: String,
    pub article_count: usize,
    pub articles: Vec<Article>,
}

/// The final output: every input article lands in exactly one category
/// or in `uncategorized`.
#[derive(Debug, Clone, Serialize)]
pub struct CategorySet {
    pub categories: Vec<Category>,
    pub uncategorized: Vec<Article>,
}

/// One search result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub article_id: String,
    pub title: String,
    pub similarity: f32,
}

/// Clustering knobs, validated by `Dbscan::new` before any embedding.
#[derive(Debug, Clone, Copy)]
pub struct ClusterParams {
    pub min_cluster_size: usize,
    pub similarity_threshold: f32,
}

#[derive(Debug, thiserror::Error)]
pub enum CategorizeError {
    #[error("no articles found in input file")]
    EmptyInput,

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Storage(#[from] VectorStorageError),

    #[error("no vector store found in {0}; run categorize first")]
    StoreMissing(String),

    #[error("internal error: {0}")]
    Internal(String),
}

struct EngineState {
    embedder: Embedder,
    index: VectorIndex,
    storage: VectorStorage,
}

/// Pipeline entry point. Engine state is loaded on first use and reused
/// for the process lifetime; the model is read-only after load, so there
/// is no teardown.
pub struct Categorizer {
    config: Config,
    persist_dir: PathBuf,
    state: Mutex<Option<EngineState>>,
}

impl Categorizer {
    pub fn new(config: Config, persist_dir: PathBuf) -> Self {
        Self {
            config,
            persist_dir,
            state: Mutex::new(None),
        }
    }

    /// Run the full pipeline over `articles` and return the categorized
    /// result. Aborts on embedding, store or clustering failure; naming
    /// never aborts a run.
    pub fn categorize(
        &self,
        articles: &[Article],
        params: ClusterParams,
    ) -> Result<CategorySet, CategorizeError> {
        // Parameter validation happens before the model is touched, so a
        // bad threshold never costs a model download
        let dbscan = Dbscan::new(params.min_cluster_size, params.similarity_threshold)?;

        let articles = dedupe_by_id(articles);
        if articles.is_empty() {
            return Err(CategorizeError::EmptyInput);
        }

        let mut guard = self.lock_state()?;
        let state = self.ensure_initialized(&mut guard)?;

        let vectors = embed_or_reuse(state, &articles)?;
        let model_id = state.embedder.model_id_hash();
        state.storage.save(&state.index, &model_id)?;

        let labels = dbscan.fit(&vectors);

        let mut names: BTreeMap<i64, String> = BTreeMap::new();
        for &label in labels.iter().filter(|&&l| l != NOISE) {
            names.entry(label).or_insert_with(|| {
                let member_titles: Vec<String> = articles
                    .iter()
                    .zip(labels.iter())
                    .filter(|(_, &l)| l == label)
                    .map(|(a, _)| a.title.clone())
                    .collect();
                naming::name_cluster(&member_titles)
            });
        }

        let result = assemble(&articles, &labels, &names);

        log::info!(
            "categorized {} articles into {} categories ({} uncategorized)",
            articles.len(),
            result.categories.len(),
            result.uncategorized.len()
        );

        Ok(result)
    }

    /// Embed `query` and return the `n_results` closest stored articles.
    pub fn search(&self, query: &str, n_results: usize) -> Result<Vec<SearchHit>, CategorizeError> {
        // Checked before the engine initializes so a missing store fails
        // without a model load
        let vectors_path = self.persist_dir.join(VECTORS_FILE);
        if !vectors_path.exists() {
            return Err(CategorizeError::StoreMissing(
                self.persist_dir.display().to_string(),
            ));
        }

        let mut guard = self.lock_state()?;
        let state = self.ensure_initialized(&mut guard)?;

        let query_vector = state.embedder.embed_one(query)?;
        let hits = state.index.query(&query_vector, n_results)?;

        Ok(hits
            .into_iter()
            .map(|hit| SearchHit {
                article_id: hit.id,
                title: hit.title,
                similarity: hit.score,
            })
            .collect())
    }

    fn lock_state(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, Option<EngineState>>, CategorizeError> {
        self.state
            .lock()
            .map_err(|e| CategorizeError::Internal(format!("state lock poisoned: {e}")))
    }

    fn ensure_initialized<'a>(
        &self,
        guard: &'a mut Option<EngineState>,
    ) -> Result<&'a mut EngineState, CategorizeError> {
        if guard.is_none() {
            *guard = Some(self.init_state()?);
        }
        guard
            .as_mut()
            .ok_or_else(|| CategorizeError::Internal("engine state missing after init".into()))
    }

    fn init_state(&self) -> Result<EngineState, CategorizeError> {
        log::info!("initializing engine with model '{}'", self.config.model);

        let embedder = Embedder::new(&self.config.model, &self.persist_dir)?;
        let model_id = embedder.model_id_hash();
        let dimensions = embedder.dimensions();

        let storage = VectorStorage::new(self.persist_dir.join(VECTORS_FILE));

        let index = if storage.exists() {
            match storage.load(&model_id, dimensions) {
                Ok(index) => {
                    log::info!("loaded {} stored vectors", index.len());
                    index
                }
                Err(VectorStorageError::ModelMismatch) => {
                    log::warn!("embedding model changed, starting a fresh index");
                    VectorIndex::new(dimensions)
                }
                Err(VectorStorageError::VersionMismatch(file_version, _)) => {
                    log::warn!(
                        "vector file version {file_version} unsupported, starting a fresh index"
                    );
                    VectorIndex::new(dimensions)
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            VectorIndex::new(dimensions)
        };

        Ok(EngineState {
            embedder,
            index,
            storage,
        })
    }
}

/// Collapse duplicate ids to their first occurrence, preserving order.
fn dedupe_by_id(articles: &[Article]) -> Vec<Article> {
    let mut seen = std::collections::HashSet::new();
    let mut unique = Vec::with_capacity(articles.len());

    for article in articles {
        if seen.insert(article.id.clone()) {
            unique.push(article.clone());
        } else {
            log::warn!("duplicate article_id '{}', keeping first occurrence", article.id);
        }
    }

    unique
}

/// Produce one vector per article, index-aligned. Articles whose id and
/// title already sit in the index keep their stored vector; the rest are
/// embedded in one batch and upserted.
fn embed_or_reuse(
    state: &mut EngineState,
    articles: &[Article],
) -> Result<Vec<Vec<f32>>, CategorizeError> {
    let mut slots: Vec<Option<Vec<f32>>> = vec![None; articles.len()];
    let mut pending: Vec<usize> = Vec::new();

    for (i, article) in articles.iter().enumerate() {
        let hash = title_hash(&article.title);
        match state.index.get(&article.id) {
            Some(entry) if entry.title_hash == hash => {
                slots[i] = Some(entry.embedding.clone());
            }
            _ => pending.push(i),
        }
    }

    if !pending.is_empty() {
        log::info!(
            "embedding {} of {} titles ({} reused)",
            pending.len(),
            articles.len(),
            articles.len() - pending.len()
        );

        let texts: Vec<String> = pending.iter().map(|&i| articles[i].title.clone()).collect();
        let embeddings = state.embedder.embed_batch(&texts)?;

        for (&i, embedding) in pending.iter().zip(embeddings) {
            let article = &articles[i];
            state.index.upsert(
                &article.id,
                &article.title,
                title_hash(&article.title),
                embedding.clone(),
            )?;
            slots[i] = Some(embedding);
        }
    }

    slots
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| CategorizeError::Internal("embedding slot left unfilled".into()))
}

/// Join labels, names and articles into the final structure. Non-noise
/// labels map to 1-based category ids in ascending label order; member
/// and uncategorized sequences preserve input order. Labels are cast to
/// native integers here so serialized ids are exact.
pub(crate) fn assemble(
    articles: &[Article],
    labels: &[i64],
    names: &BTreeMap<i64, String>,
) -> CategorySet {
    let mut categories: Vec<Category> = Vec::with_capacity(names.len());

    for (position, (&label, name)) in names.iter().enumerate() {
        let members: Vec<Article> = articles
            .iter()
            .zip(labels.iter())
            .filter(|(_, &l)| l == label)
            .map(|(a, _)| a.clone())
            .collect();

        categories.push(Category {
            category_id: position as u32 + 1,
            category_name: name.clone(),
            article_count: members.len(),
            articles: members,
        });
    }

    let uncategorized: Vec<Article> = articles
        .iter()
        .zip(labels.iter())
        .filter(|(_, &l)| l == NOISE)
        .map(|(a, _)| a.clone())
        .collect();

    CategorySet {
        categories,
        uncategorized,
    }
}
