//! Derived vector/keyword index seam.
//!
//! The store treats the index as an adapter behind [`VectorIndex`]: mutations
//! commit first, index calls follow, and an index failure never un-commits a
//! store mutation. Upsert and delete are idempotent so a failed sync can be
//! retried later (see the service `reindex` operation).

pub mod sqlite_vec;

use thiserror::Error;

use crate::memory::types::Metadata;

pub type IndexResult<T> = std::result::Result<T, IndexError>;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("embedding failed: {0}")]
    Embedding(#[from] crate::embedding::EmbeddingError),

    #[error("index database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("index lock poisoned")]
    LockPoisoned,
}

/// A ranked vector hit.
#[derive(Debug, Clone)]
pub struct IndexHit {
    pub content_id: String,
    /// `1 − cosine distance`; higher is closer.
    pub similarity: f64,
}

/// Index over memory contents, scoped by memory id.
///
/// Implementations must be idempotent under retry: `upsert` replaces any
/// existing entry for the content id, `delete`/`delete_all` succeed when
/// nothing matches. Methods are synchronous; call through `spawn_blocking`
/// from async contexts.
pub trait VectorIndex: Send + Sync {
    /// Embed `text` and store it under (`memory_id`, `content_id`), replacing
    /// any previous entry for the content. `metadata` is carried for engines
    /// that store payloads alongside vectors; the embedded engine keeps
    /// metadata in the relational store and ignores it here.
    fn upsert(
        &self,
        memory_id: &str,
        content_id: &str,
        text: &str,
        metadata: &Metadata,
    ) -> IndexResult<()>;

    /// Drop the entry for one content id, if present.
    fn delete(&self, content_id: &str) -> IndexResult<()>;

    /// Drop every entry belonging to a memory, if any.
    fn delete_all(&self, memory_id: &str) -> IndexResult<()>;

    /// Semantic KNN within one memory, best first.
    fn search(&self, memory_id: &str, query: &str, limit: usize) -> IndexResult<Vec<IndexHit>>;

    /// BM25 keyword match within one memory; content ids best-rank-first.
    fn keyword_search(
        &self,
        memory_id: &str,
        query: &str,
        limit: usize,
    ) -> IndexResult<Vec<String>>;
}
