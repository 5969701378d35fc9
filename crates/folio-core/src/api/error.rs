//! HTTP error responses

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::Error;
use crate::models::ResponseSource;

/// Apology shown when a chat request fails internally
pub const CHAT_APOLOGY: &str =
    "Sorry, I'm having trouble responding right now. Please try again later or use the contact form.";

/// Shown when a contact message could not be relayed
pub const CONTACT_FAILURE: &str = "Failed to send message. Please try again later.";

/// API error with HTTP status code, rendered as `{success: false, message}`
#[derive(Debug)]
pub struct ApiError {
    /// HTTP status
    pub status: StatusCode,
    /// Message shown to the caller
    pub message: String,
    /// Response source, set on failed chat replies
    pub source: Option<ResponseSource>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<ResponseSource>,
}

impl ApiError {
    /// 400 with the given message
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            source: None,
        }
    }

    /// 500 with the given message
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            source: None,
        }
    }

    /// Tag the body with a response source
    pub fn with_source(mut self, source: ResponseSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Map a service error, using `fallback_message` for anything that is not
    /// the caller's fault
    pub fn from_service(err: Error, fallback_message: &str) -> Self {
        match err {
            Error::Validation(message) => Self::bad_request(message),
            _ => Self::internal_error(fallback_message),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            success: false,
            message: &self.message,
            source: self.source,
        });

        (self.status, body).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}
