//! HTTP embedding provider.
//!
//! Speaks the Ollama embeddings endpoint (`POST /api/embeddings`) or an
//! OpenAI-compatible one (`POST /embeddings` with bearer auth), selected by
//! the configured provider name.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::{Embedder, EmbeddingError};
use crate::config::EmbeddingConfig;

#[derive(Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct OpenAiEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingData>,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingData {
    embedding: Vec<f32>,
}

enum Protocol {
    Ollama,
    OpenAi,
}

pub struct HttpEmbedder {
    client: Client,
    protocol: Protocol,
    base_url: String,
    model: String,
    api_key: Option<String>,
    dimensions: usize,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let protocol = match config.provider.as_str() {
            "ollama" => Protocol::Ollama,
            "openai" => Protocol::OpenAi,
            other => return Err(EmbeddingError::UnknownProvider(other.to_string())),
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            protocol,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            dimensions: config.dimensions,
        })
    }

    fn embed_ollama(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = OllamaEmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()?
            .error_for_status()?
            .json::<OllamaEmbeddingResponse>()?;

        Ok(response.embedding)
    }

    fn embed_openai(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| EmbeddingError::InvalidResponse("API key required".to_string()))?;

        let request = OpenAiEmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&request)
            .send()?
            .error_for_status()?
            .json::<OpenAiEmbeddingResponse>()?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::InvalidResponse("no embedding in response".to_string()))
    }
}

impl Embedder for HttpEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyText);
        }

        let embedding = match self.protocol {
            Protocol::Ollama => self.embed_ollama(text)?,
            Protocol::OpenAi => self.embed_openai(text)?,
        };

        if embedding.len() != self.dimensions {
            return Err(EmbeddingError::InvalidResponse(format!(
                "model returned {} dimensions, configured for {}",
                embedding.len(),
                self.dimensions
            )));
        }

        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
