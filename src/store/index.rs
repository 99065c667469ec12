//! In-memory vector index with cosine similarity queries.

use std::collections::HashMap;

/// A stored record: the embedded title, its fingerprint, and the vector.
#[derive(Debug, Clone)]
pub struct VectorEntry {
    pub title_hash: u64,
    pub title: String,
    pub embedding: Vec<f32>,
}

/// A similarity query result.
#[derive(Debug, Clone)]
pub struct QueryHit {
    pub id: String,
    pub title: String,
    pub score: f32,
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("cannot store or query a zero-norm vector")]
    ZeroNormVector,
}

/// Article id -> vector record. Upserting an existing id replaces its
/// record, so re-ingesting the same corpus never grows the index.
pub struct VectorIndex {
    entries: HashMap<String, VectorEntry>,
    dimensions: usize,
}

impl VectorIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            entries: HashMap::new(),
            dimensions,
        }
    }

    pub fn with_capacity(dimensions: usize, capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            dimensions,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or overwrite the record for `id`.
    pub fn upsert(
        &mut self,
        id: &str,
        title: &str,
        title_hash: u64,
        embedding: Vec<f32>,
    ) -> Result<(), IndexError> {
        if embedding.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: embedding.len(),
            });
        }

        if l2_norm(&embedding) < f32::EPSILON {
            return Err(IndexError::ZeroNormVector);
        }

        self.entries.insert(
            id.to_string(),
            VectorEntry {
                title_hash,
                title: title.to_string(),
                embedding,
            },
        );

        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&VectorEntry> {
        self.entries.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VectorEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Top-`k` records by cosine similarity to `query`, descending.
    /// Ties break on id so the ordering is reproducible.
    pub fn query(&self, query: &[f32], k: usize) -> Result<Vec<QueryHit>, IndexError> {
        if query.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: query.len(),
            });
        }

        let query_norm = l2_norm(query);
        if query_norm < f32::EPSILON {
            return Err(IndexError::ZeroNormVector);
        }

        let mut hits: Vec<QueryHit> = self
            .entries
            .iter()
            .map(|(id, entry)| QueryHit {
                id: id.clone(),
                title: entry.title.clone(),
                score: cosine_similarity(query, &entry.embedding, query_norm),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(k);

        Ok(hits)
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// `query_norm` is precomputed once per query.
fn cosine_similarity(query: &[f32], target: &[f32], query_norm: f32) -> f32 {
    let target_norm = l2_norm(target);
    if target_norm < f32::EPSILON {
        return 0.0;
    }

    let dot: f32 = query.iter().zip(target.iter()).map(|(a, b)| a * b).sum();
    dot / (query_norm * target_norm)
}
