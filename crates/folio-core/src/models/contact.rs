//! Contact form models

use serde::{Deserialize, Serialize};

/// Body of `POST /api/contact`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactRequest {
    /// Visitor name
    #[serde(default)]
    pub name: Option<String>,
    /// Visitor email address
    #[serde(default)]
    pub email: Option<String>,
    /// Message subject
    #[serde(default)]
    pub subject: Option<String>,
    /// Message body
    #[serde(default)]
    pub message: Option<String>,
}

/// A contact submission that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSubmission {
    /// Visitor name
    pub name: String,
    /// Visitor email address
    pub email: String,
    /// Message subject
    pub subject: String,
    /// Message body
    pub message: String,
}

/// A rendered email handed to the mail relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMail {
    /// Sender address
    pub from: String,
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html: String,
}

/// Generic `{success, message}` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Whether the operation succeeded
    pub success: bool,
    /// Human readable outcome
    pub message: String,
}

impl MessageResponse {
    /// Successful outcome
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}
