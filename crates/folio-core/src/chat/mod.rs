//! Chat pipeline
//!
//! `ChatService` drives one visitor message through validation, response
//! resolution and metrics recording.

pub mod completion;
pub mod fallback;
pub mod resolver;

pub use completion::{
    ChatMessage, ChatRole, Completion, CompletionClient, CompletionError, CompletionRequest,
    ErrorKind, OpenAiClient,
};
pub use fallback::{CannedResponseTable, KeywordEntry};
pub use resolver::{Resolution, ResolverSettings, ResponseResolver, PLACEHOLDER_API_KEY};

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::analytics::MetricsAggregator;
use crate::error::{Error, Result};
use crate::models::{ChatReply, ChatRequest, ResponseSource};

/// Classification recorded for failures that are not completion errors
pub const INTERNAL_ERROR: &str = "internal";

/// Handles chat requests and records their analytics
#[derive(Debug, Clone)]
pub struct ChatService {
    resolver: ResponseResolver,
    metrics: Arc<MetricsAggregator>,
    response_delay: Duration,
}

impl ChatService {
    /// Create a service
    pub fn new(
        resolver: ResponseResolver,
        metrics: Arc<MetricsAggregator>,
        response_delay: Duration,
    ) -> Self {
        Self {
            resolver,
            metrics,
            response_delay,
        }
    }

    /// Shared metrics
    pub fn metrics(&self) -> &Arc<MetricsAggregator> {
        &self.metrics
    }

    /// Whether answers may come from the completion service
    pub fn external_enabled(&self) -> bool {
        self.resolver.has_credential()
    }

    /// Answer one chat request
    ///
    /// The request is counted before validation, so rejected requests still
    /// show up in `totalRequests`.
    pub async fn respond(&self, request: ChatRequest) -> Result<ChatReply> {
        let span = info_span!("chat", request_id = %Uuid::new_v4());
        self.respond_inner(request).instrument(span).await
    }

    async fn respond_inner(&self, request: ChatRequest) -> Result<ChatReply> {
        let started = Instant::now();
        let total_requests = self.metrics.record_request_start();

        let message = match request.message.as_deref().map(str::trim) {
            Some(message) if !message.is_empty() => message.to_string(),
            _ => return Err(Error::validation("Message is required")),
        };
        let history = request.conversation_history.unwrap_or_default();

        let resolution = match self.resolver.resolve(&message, &history).await {
            Ok(resolution) => resolution,
            Err(err) => {
                error!(error = %err, "Chat request failed");
                self.metrics.record_error(INTERNAL_ERROR);
                return Err(err);
            }
        };

        match (resolution.source, resolution.tokens) {
            (ResponseSource::External, Some(tokens)) => {
                self.metrics.record_external_success(tokens);
                info!(
                    tokens,
                    cost = self.metrics.estimate_cost(tokens),
                    "Completion answered"
                );
            }
            _ => self.metrics.record_fallback(),
        }

        if let Some(failure) = &resolution.failure {
            let kind = failure.kind();
            if failure.is_timeout() {
                self.metrics.record_timeout();
            }
            match kind {
                ErrorKind::RateLimit | ErrorKind::QuotaExceeded => warn!(
                    error_type = %kind,
                    error = %failure,
                    "Completion unavailable, using canned response"
                ),
                _ => error!(
                    error_type = %kind,
                    error = %failure,
                    "Completion failed, using canned response"
                ),
            }
            self.metrics.record_error(kind.as_str());
        }

        if !self.response_delay.is_zero() {
            tokio::time::sleep(self.response_delay).await;
        }

        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.metrics.record_latency(latency_ms);

        info!(source = %resolution.source, latency_ms, "Chat request answered");

        Ok(ChatReply {
            message: resolution.text,
            source: resolution.source,
            latency_ms,
            total_requests,
        })
    }
}
