//! Text-generation seam.
//!
//! Provides the [`TextGenerator`] trait and an HTTP implementation speaking
//! either the Ollama chat protocol or an OpenAI-compatible one. Used by the
//! reflection pipeline; no retry logic lives at this layer.

pub mod http;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid generation response: {0}")]
    InvalidResponse(String),

    #[error("unknown generation provider: {0} (supported: ollama, openai)")]
    UnknownProvider(String),
}

/// Trait for turning a prompt pair into generated text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<String, GenerationError>;
}

/// Create a text-generation provider from config.
pub fn create_generator(
    config: &crate::config::GenerationConfig,
) -> Result<Box<dyn TextGenerator>, GenerationError> {
    match config.provider.as_str() {
        "ollama" | "openai" => Ok(Box::new(http::HttpGenerator::new(config)?)),
        other => Err(GenerationError::UnknownProvider(other.to_string())),
    }
}
