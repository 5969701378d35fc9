//! Chat request/response models

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a chat answer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    /// Generated by the completion service
    External,
    /// Picked from the canned response table
    Fallback,
    /// The request failed internally
    Error,
}

impl ResponseSource {
    /// Wire name of the source
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::External => "external",
            Self::Fallback => "fallback",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One prior message of the conversation, as the site's chat widget sends it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Message text
    #[serde(default, alias = "content")]
    pub text: String,

    /// `user` for visitor messages, anything else is treated as the assistant
    #[serde(default, alias = "role")]
    pub sender: Option<String>,
}

impl ConversationTurn {
    /// Create a visitor turn
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Some("user".to_string()),
        }
    }

    /// Create an assistant turn
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Some("bot".to_string()),
        }
    }

    /// Whether the visitor wrote this turn
    pub fn is_user(&self) -> bool {
        self.sender
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("user"))
    }
}

/// Body of `POST /api/chat`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// The visitor's message (required, non-empty)
    #[serde(default)]
    pub message: Option<String>,

    /// Prior turns, oldest first
    #[serde(default)]
    pub conversation_history: Option<Vec<ConversationTurn>>,
}

impl ChatRequest {
    /// Build a request for a single message without history
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            conversation_history: None,
        }
    }
}

/// Result of one handled chat request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    /// Answer text
    pub message: String,
    /// Provenance of the answer
    pub source: ResponseSource,
    /// Wall time spent on the request, including the artificial delay
    pub latency_ms: u64,
    /// Total chat requests seen so far, this one included
    pub total_requests: u64,
}

/// Per-request analytics echoed back to the chat widget
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatAnalytics {
    /// Response time in milliseconds
    pub response_time: u64,
    /// Total chat requests so far
    pub total_requests: u64,
    /// Provenance of the answer
    pub source: ResponseSource,
}

/// Body returned by `POST /api/chat`
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    /// Always true for a delivered answer
    pub success: bool,
    /// Answer text
    pub message: String,
    /// Provenance of the answer
    pub source: ResponseSource,
    /// Per-request analytics
    pub analytics: ChatAnalytics,
}

impl From<ChatReply> for ChatResponse {
    fn from(reply: ChatReply) -> Self {
        Self {
            success: true,
            analytics: ChatAnalytics {
                response_time: reply.latency_ms,
                total_requests: reply.total_requests,
                source: reply.source,
            },
            message: reply.message,
            source: reply.source,
        }
    }
}
