//! Chat-completion API client
//!
//! One call, one request: a system instruction plus a single user message,
//! JSON-object response mode, bounded output tokens. There is no retry or
//! backoff here; callers decide how to degrade.

use async_trait::async_trait;
use reqwest::{header, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_COMPLETION_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const USER_AGENT: &str = concat!("promptlist/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Instruction sent as the system message of every completion
pub const SYSTEM_PROMPT: &str = "You are a music expert and playlist curator. \
Build a playlist that fits the user's request.
For each song provide: title, artist, album, release year, duration in seconds, \
and a short explanation of why it fits the request.

Respond with a single JSON object shaped exactly like this:
{
  \"title\": \"Playlist title\",
  \"description\": \"Playlist description\",
  \"tracks\": [
    {
      \"title\": \"Song title\",
      \"artist\": \"Artist name\",
      \"album\": \"Album name\",
      \"year\": 2023,
      \"duration\": 180,
      \"explanation\": \"Why this song fits the request\"
    }
  ]
}";

/// Completion client errors
#[derive(Debug, Error)]
pub enum CompletionError {
    /// 401: the configured credential is invalid or expired
    #[error("Completion credential rejected: {0}")]
    Auth(String),

    /// 429
    #[error("Completion endpoint rate limited")]
    RateLimited,

    /// 5xx
    #[error("Completion server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Any other non-2xx status
    #[error("Completion API error {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    /// Response (or its content) is not the JSON object that was asked for
    #[error("Malformed completion: {0}")]
    Malformed(String),
}

/// Anything that can turn a prompt into raw completion text
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Issue exactly one completion request and return the message content
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
    ) -> Result<String, CompletionError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    response_format: ResponseFormat,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// OpenAI-compatible chat-completion client
pub struct OpenAiCompletionClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompletionClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, CompletionError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletionClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
    ) -> Result<String, CompletionError> {
        if self.api_key.trim().is_empty() {
            return Err(CompletionError::Auth("API key not configured".to_string()));
        }

        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
            max_tokens,
        };

        tracing::debug!(
            model = %self.model,
            prompt_chars = user_prompt.len(),
            max_tokens,
            "Requesting completion"
        );

        let response = self
            .http_client
            .post(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Malformed(e.to_string()))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CompletionError::Malformed("Completion has no content".to_string()))?;

        tracing::debug!(chars = content.len(), "Completion received");

        Ok(content)
    }
}

/// Map a non-2xx status and body to the error taxonomy
fn classify_failure(status: StatusCode, body: &str) -> CompletionError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.to_string());

    match status {
        StatusCode::UNAUTHORIZED => CompletionError::Auth(message),
        StatusCode::TOO_MANY_REQUESTS => CompletionError::RateLimited,
        s if s.is_server_error() => CompletionError::Server {
            status: s.as_u16(),
            message,
        },
        s => CompletionError::Upstream {
            status: s.as_u16(),
            message,
        },
    }
}
