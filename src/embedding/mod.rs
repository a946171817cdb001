//! Text-to-vector embedding seam.
//!
//! Provides the [`Embedder`] trait and an HTTP implementation speaking
//! either the Ollama embeddings protocol or an OpenAI-compatible one. The
//! provider is created via [`create_embedder`] from configuration.

pub mod http;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("cannot embed empty text")]
    EmptyText,

    #[error("unknown embedding provider: {0} (supported: ollama, openai)")]
    UnknownProvider(String),
}

/// Turns text into fixed-width vectors.
///
/// Implementations block on I/O; async callers run them on the blocking
/// pool.
pub trait Embedder: Send + Sync {
    /// Embed one text into a vector of [`Self::dimensions`] length.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Width of the vectors [`embed`](Self::embed) produces.
    fn dimensions(&self) -> usize;
}

/// Build the configured embedding provider.
pub fn create_embedder(
    config: &crate::config::EmbeddingConfig,
) -> Result<Box<dyn Embedder>, EmbeddingError> {
    match config.provider.as_str() {
        "ollama" | "openai" => Ok(Box::new(http::HttpEmbedder::new(config)?)),
        other => Err(EmbeddingError::UnknownProvider(other.to_string())),
    }
}
