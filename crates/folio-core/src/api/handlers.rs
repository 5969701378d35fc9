//! API handlers for the HTTP REST API

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::analytics::MetricsAggregator;
use crate::chat::ChatService;
use crate::contact::ContactService;
use crate::models::{
    AnalyticsResponse, ChatRequest, ChatResponse, ContactRequest, MessageResponse, ResponseSource,
};

use super::error::{ApiError, CHAT_APOLOGY, CONTACT_FAILURE};

/// Application state shared across handlers
#[derive(Debug, Clone)]
pub struct AppState {
    /// Chat pipeline
    pub chat: ChatService,
    /// Analytics shared with the chat pipeline
    pub metrics: Arc<MetricsAggregator>,
    /// Contact form relay
    pub contact: ContactService,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always true while the server answers
    pub success: bool,
    /// Human readable status
    pub message: String,
    /// Crate version of the running server
    pub version: String,
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        message: "Server is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Answer a chat message
pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = body?;

    let reply = state.chat.respond(request).await.map_err(|e| {
        let err = ApiError::from_service(e, CHAT_APOLOGY);
        if err.status.is_server_error() {
            err.with_source(ResponseSource::Error)
        } else {
            err
        }
    })?;

    Ok(Json(ChatResponse::from(reply)))
}

/// Current analytics snapshot
pub async fn analytics(State(state): State<AppState>) -> Json<AnalyticsResponse> {
    debug!("Analytics request received");

    Json(AnalyticsResponse {
        success: true,
        data: state.metrics.snapshot(),
    })
}

/// Relay a contact form submission
pub async fn contact(
    State(state): State<AppState>,
    body: Result<Json<ContactRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) = body?;

    state
        .contact
        .submit(request)
        .await
        .map_err(|e| ApiError::from_service(e, CONTACT_FAILURE))?;

    info!("Contact form submitted");
    Ok(Json(MessageResponse::ok("Message sent successfully!")))
}
