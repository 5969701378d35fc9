//! Completion service client
//!
//! `CompletionClient` is the seam between the resolver and the language-model
//! API. `OpenAiClient` speaks the OpenAI-compatible `/chat/completions`
//! protocol; failures come back as `CompletionError`, which classifies itself
//! into the categories tracked by analytics.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CompletionConfig;
use crate::error::{Error, Result};

/// Role of a prompt message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Persona instructions
    System,
    /// Visitor
    User,
    /// The assistant's earlier answers
    Assistant,
}

/// One prompt message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author of the message
    pub role: ChatRole,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Create a message
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A completion call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// System preamble, context turns and the user message, in order
    pub messages: Vec<ChatMessage>,
    /// Completion token cap
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

/// A successful completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Generated text
    pub text: String,
    /// Total tokens reported by the service, 0 when absent
    pub tokens: u64,
}

/// Classification of a failed completion call, used as the analytics key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// HTTP 429
    RateLimit,
    /// HTTP 401
    InvalidApiKey,
    /// HTTP 402
    QuotaExceeded,
    /// Connection refused, unreachable host or timeout
    NetworkError,
    /// HTTP 5xx
    ServerError,
    /// Anything else
    Unknown,
}

impl ErrorKind {
    /// Analytics key
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimit => "rate_limit",
            Self::InvalidApiKey => "invalid_api_key",
            Self::QuotaExceeded => "quota_exceeded",
            Self::NetworkError => "network_error",
            Self::ServerError => "server_error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completion call failures
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// Non-2xx response
    #[error("completion service returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// The call lost the race against the deadline
    #[error("completion request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection-level failure
    #[error("network error: {0}")]
    Network(String),

    /// 2xx response without a usable completion
    #[error("malformed completion response: {0}")]
    Malformed(String),

    /// Any other client failure
    #[error("completion request failed: {0}")]
    Other(String),
}

impl CompletionError {
    /// Classify the failure
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Status { status: 429, .. } => ErrorKind::RateLimit,
            Self::Status { status: 401, .. } => ErrorKind::InvalidApiKey,
            Self::Status { status: 402, .. } => ErrorKind::QuotaExceeded,
            Self::Status { status, .. } if *status >= 500 => ErrorKind::ServerError,
            Self::Timeout(_) | Self::Network(_) => ErrorKind::NetworkError,
            Self::Status { .. } | Self::Malformed(_) | Self::Other(_) => ErrorKind::Unknown,
        }
    }

    /// Whether the call timed out
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// HTTP status, when the service answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::Network(err.to_string())
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status {
                status: status.as_u16(),
                body: String::new(),
            }
        } else {
            Self::Other(err.to_string())
        }
    }
}

/// A language-model completion service
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Run one completion
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<Completion, CompletionError>;
}

/// Client for OpenAI-compatible `/chat/completions` APIs
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    /// Create a client from configuration; a missing key is sent as empty
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("folio/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone().unwrap_or_default(),
            model: config.model.clone(),
        })
    }
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: Option<u64>,
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<Completion, CompletionError> {
        let body = ChatCompletionBody {
            model: &self.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Malformed(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| CompletionError::Malformed("no completion text".to_string()))?;

        let tokens = parsed.usage.and_then(|u| u.total_tokens).unwrap_or(0);
        debug!(model = %self.model, tokens, "Completion received");

        Ok(Completion { text, tokens })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Scripted completion client for resolver and service tests

    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// What the scripted client does on every call
    #[derive(Debug, Clone)]
    pub enum Script {
        Reply(String, u64),
        FailStatus(u16),
        Hang,
    }

    /// Counts calls and records the last request
    #[derive(Debug)]
    pub struct ScriptedClient {
        script: Script,
        calls: AtomicUsize,
        last_request: Mutex<Option<CompletionRequest>>,
    }

    impl ScriptedClient {
        pub fn new(script: Script) -> Self {
            Self {
                script,
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn last_request(&self) -> Option<CompletionRequest> {
            self.last_request.lock().clone()
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> std::result::Result<Completion, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock() = Some(request.clone());

            match &self.script {
                Script::Reply(text, tokens) => Ok(Completion {
                    text: text.clone(),
                    tokens: *tokens,
                }),
                Script::FailStatus(status) => Err(CompletionError::Status {
                    status: *status,
                    body: String::new(),
                }),
                Script::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(CompletionError::Other("unreachable".to_string()))
                }
            }
        }
    }
}
