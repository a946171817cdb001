//! HTTP text-generation provider.
//!
//! Speaks the Ollama chat endpoint (`POST /api/chat`) or an OpenAI-compatible
//! one (`POST /chat/completions` with bearer auth), selected by the
//! configured provider name.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{GenerationError, TextGenerator};
use crate::config::GenerationConfig;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaChatMessage,
}

#[derive(Deserialize)]
struct OllamaChatMessage {
    content: String,
}

#[derive(Serialize)]
struct OpenAiChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Deserialize)]
struct OpenAiChoiceMessage {
    content: String,
}

enum Protocol {
    Ollama,
    OpenAi,
}

pub struct HttpGenerator {
    client: Client,
    protocol: Protocol,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self, GenerationError> {
        let protocol = match config.provider.as_str() {
            "ollama" => Protocol::Ollama,
            "openai" => Protocol::OpenAi,
            other => return Err(GenerationError::UnknownProvider(other.to_string())),
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
        })
    }

    fn messages<'a>(system_prompt: &'a str, user_message: &'a str) -> Vec<ChatMessage<'a>> {
        vec![
            ChatMessage {
                role: "system",
                content: system_prompt,
            },
            ChatMessage {
                role: "user",
                content: user_message,
            },
        ]
    }

    async fn generate_ollama(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<String, GenerationError> {
        let request = OllamaChatRequest {
            model: &self.model,
            messages: Self::messages(system_prompt, user_message),
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<OllamaChatResponse>()
            .await?;

        Ok(response.message.content)
    }

    async fn generate_openai(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<String, GenerationError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| GenerationError::InvalidResponse("API key required".to_string()))?;

        let request = OpenAiChatRequest {
            model: &self.model,
            messages: Self::messages(system_prompt, user_message),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<OpenAiChatResponse>()
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GenerationError::InvalidResponse("no choices in response".to_string()))
    }
}

#[async_trait]
impl TextGenerator for HttpGenerator {
    async fn generate(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<String, GenerationError> {
        match self.protocol {
            Protocol::Ollama => self.generate_ollama(system_prompt, user_message).await,
            Protocol::OpenAi => self.generate_openai(system_prompt, user_message).await,
        }
    }
}
