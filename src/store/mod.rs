//! Vector store: (id, vector, title) records with cosine similarity
//! queries and on-disk persistence.
//!
//! - `index`: in-memory map keyed by article id, brute-force similarity
//!   search
//! - `persist`: binary file I/O for `vectors.bin` under the persist dir
//!
//! Records carry a hash of the title that produced the vector, so a rerun
//! over an unchanged `id` + `title` pair can reuse the stored vector
//! instead of re-embedding it.

mod index;
mod persist;

pub use index::{IndexError, QueryHit, VectorEntry, VectorIndex};
pub use persist::{VectorStorage, VectorStorageError};

/// Name of the vector file inside the persist dir.
pub const VECTORS_FILE: &str = "vectors.bin";

/// Fingerprint of the text that was embedded, for re-embedding skips.
/// `DefaultHasher::new()` is keyed with constants, so the value is stable
/// across processes.
pub fn title_hash(title: &str) -> u64 {
    use std::hash::{Hash, Hasher};

    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    title.trim().hash(&mut hasher);
    hasher.finish()
}
