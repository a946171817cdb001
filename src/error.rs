//! Crate-wide error type and result alias.
//!
//! The library core returns [`HindsightError`] so callers can match on the
//! failure class; the CLI edges wrap it in `anyhow` for reporting.

use thiserror::Error;

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, HindsightError>;

#[derive(Debug, Error)]
pub enum HindsightError {
    /// Row missing, or reachable only under a different owner.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation is well-formed but not permitted for this target,
    /// e.g. rolling back a `create` entry or mutating a snapshot memory.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A snapshot payload did not parse into the expected shape.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// The text-generation backend failed. Distinct from an unparseable
    /// reply, which reflection stores rather than raising.
    #[error("text generation failed: {0}")]
    Generation(String),

    /// The vector/keyword index could not be updated or queried. Non-fatal
    /// on write paths (the store row is already committed); surfaced on
    /// read paths.
    #[error("index sync failed: {0}")]
    IndexSync(#[from] crate::index::IndexError),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A shared connection lock was poisoned by a panicking holder.
    #[error("database lock poisoned")]
    LockPoisoned,
}

impl HindsightError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_op(why: impl Into<String>) -> Self {
        Self::InvalidOperation(why.into())
    }
}
