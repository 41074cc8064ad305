// OpenAI-compatible chat-completions client
// Single request per batch, no retries; the caller owns the overall timeout

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::core::config::TranslationConfig;
use crate::core::errors::{TranslationError, TranslationResult};

/// A system prompt plus one user message in, the assistant's text out.
pub trait ChatCompletion: Send + Sync {
    fn complete<'a>(&'a self, system: &'a str, user: &'a str) -> BoxFuture<'a, TranslationResult<String>>;
}

pub struct OpenAiChatClient {
    api_key: String,
    http_client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiChatClient {
    pub fn new(api_key: String, config: &TranslationConfig) -> TranslationResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.timeout_seconds.min(10)))
            .build()?;

        Ok(Self {
            api_key,
            http_client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, system: &str, user: &str) -> TranslationResult<String> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.temperature,
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| TranslationError::InvalidResponse(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(TranslationError::EmptyResponse)?;

        debug!("Chat completion returned {} bytes", content.len());
        Ok(content)
    }
}

impl ChatCompletion for OpenAiChatClient {
    fn complete<'a>(&'a self, system: &'a str, user: &'a str) -> BoxFuture<'a, TranslationResult<String>> {
        Box::pin(self.send(system, user))
    }
}
