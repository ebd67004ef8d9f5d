use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::{AppError, AppResult};

/// One chat turn sent to the completion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// OpenAI-compatible chat completion request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ChatMessage,
}

/// Anything that can turn a list of messages into a single reply.
#[async_trait]
pub trait CompletionService: Send + Sync {
    fn model(&self) -> &str;

    async fn complete(&self, messages: Vec<ChatMessage>, temperature: f32, max_tokens: u32) -> AppResult<String>;
}

/// Retry policy for rate-limited completion calls: exponential backoff
/// from `base_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfiguration {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryConfiguration {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryConfiguration {
    /// Wait before retry number `attempt` (zero based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

/// `reqwest` client for a Groq / OpenAI style `chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    retry: RetryConfiguration,
}

impl CompletionClient {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            api_url: api_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            retry: RetryConfiguration::default(),
        })
    }
}

#[async_trait]
impl CompletionService for CompletionClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: Vec<ChatMessage>, temperature: f32, max_tokens: u32) -> AppResult<String> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages,
            temperature,
            max_tokens,
        };

        let mut attempt = 0;
        loop {
            let response = self
                .http
                .post(&self.api_url)
                .bearer_auth(&self.api_key)
                .json(&request)
                .send()
                .await?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS && attempt < self.retry.max_retries {
                let delay = self.retry.delay_for(attempt);
                warn!(attempt, ?delay, "completion endpoint rate limited, backing off");
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::Upstream(format!("status {status}: {body}")));
            }

            let parsed: CompletionResponse = response.json().await?;
            debug!(choices = parsed.choices.len(), "completion received");
            return parsed
                .choices
                .into_iter()
                .next()
                .map(|choice| choice.message.content)
                .ok_or_else(|| AppError::Upstream("completion returned no choices".to_string()));
        }
    }
}
