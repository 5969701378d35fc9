//! REST API implementation
//!
//! This module provides the HTTP API served to the portfolio site.

pub mod error;
pub mod handlers;
pub mod routes;

pub use error::ApiError;
pub use handlers::AppState;
pub use routes::create_router;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::analytics::{CostCalculator, MetricsAggregator};
use crate::chat::{ChatService, ResponseResolver};
use crate::config::Config;
use crate::contact::ContactService;
use crate::error::{Error, Result};

impl AppState {
    /// Wire every service from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let cost = CostCalculator::for_model(
            &config.completion.model,
            config.analytics.cost_per_1k_tokens,
        );
        let metrics = Arc::new(MetricsAggregator::new(&config.analytics, cost));
        let resolver = ResponseResolver::from_config(config)?;

        if !resolver.has_credential() {
            info!("No completion API key configured, answering from canned responses");
        }

        Ok(Self {
            chat: ChatService::new(resolver, metrics.clone(), config.chat.response_delay()),
            metrics,
            contact: ContactService::from_config(&config.contact)?,
        })
    }
}

/// HTTP API server
pub struct HttpServer {
    state: AppState,
    allowed_origins: Vec<String>,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(state: AppState, allowed_origins: Vec<String>) -> Self {
        Self {
            state,
            allowed_origins,
        }
    }

    /// Router with CORS and request tracing applied
    pub fn router(&self) -> Router {
        create_router(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(&self.allowed_origins))
    }

    /// Start the HTTP server
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.router();

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Internal(format!("failed to bind {addr}: {e}")))?;

        info!("HTTP server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        info!("HTTP server stopped");
        Ok(())
    }
}

/// Any origin when the list is empty, otherwise exactly the listed ones
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(origins)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
