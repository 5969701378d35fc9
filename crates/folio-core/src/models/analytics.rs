//! Analytics snapshot models

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token usage across external completions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    /// Sum of reported tokens
    pub total: u64,
    /// `total / externalResponses`
    pub average: f64,
    /// Largest single completion
    pub max: u64,
    /// Smallest single completion (`null` until the first one)
    pub min: Option<u64>,
}

/// Estimated spend on external completions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostTracking {
    /// Accumulated cost
    pub total_cost: f64,
    /// `totalCost / externalResponses`
    pub average_cost: f64,
    /// `totalCost / totalRequests`
    pub cost_per_request: f64,
}

/// Sticky alert flags; once raised they stay raised for the process lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertFlags {
    /// Average tokens per completion went over the threshold
    pub high_token_usage: bool,
    /// Average cost per completion went over the threshold
    pub high_cost: bool,
    /// Error percentage went over the threshold
    pub error_spike: bool,
}

/// Latency summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    /// Recency-weighted average, rounded to whole milliseconds
    pub average_response_time: u64,
    /// Mean of the retained response time window, rounded
    pub window_average_response_time: u64,
    /// Requests slower than the slow threshold
    pub slow_requests: u64,
    /// External calls that lost the timeout race
    pub timeout_count: u64,
    /// Retained response times, oldest first
    pub recent_response_times: Vec<u64>,
}

/// Read-only view of the chat analytics, served by `GET /api/analytics`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    /// Time since process start, `"<h>h <m>m"`
    pub uptime: String,
    /// Process start time
    pub started_at: DateTime<Utc>,
    /// Chat requests received
    pub total_requests: u64,
    /// Answers produced by the completion service
    pub external_responses: u64,
    /// Answers picked from the canned table
    pub fallback_responses: u64,
    /// Recorded errors
    pub error_count: u64,
    /// Rounded share of external answers, 0 with no requests
    pub external_percentage: u64,
    /// Rounded share of fallback answers, 0 with no requests
    pub fallback_percentage: u64,
    /// Token usage
    pub token_usage: TokenUsage,
    /// Cost estimates
    pub cost_tracking: CostTracking,
    /// Latency summary
    pub performance: PerformanceSummary,
    /// Alert flags
    pub alerts: AlertFlags,
    /// Error occurrences keyed by classification
    pub error_types: BTreeMap<String, u64>,
}

/// Body returned by `GET /api/analytics`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsResponse {
    /// Always true
    pub success: bool,
    /// The snapshot
    pub data: AnalyticsSnapshot,
}
