//! In-memory chat analytics
//!
//! Counters live behind a single mutex so every `record_*` call is applied
//! atomically; alert flags sit beside them as sticky atomics. Nothing here is
//! persisted, a restart starts from zero.

use std::collections::{BTreeMap, VecDeque};
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{error, warn};

use crate::config::AnalyticsConfig;
use crate::models::{AnalyticsSnapshot, CostTracking, PerformanceSummary, TokenUsage};

use super::alerts::{AlertBoard, AlertKind, AlertThresholds};
use super::cost::CostCalculator;

/// Mutable counters guarded by the aggregator's lock
#[derive(Debug, Default)]
struct MetricsState {
    total_requests: u64,
    external_responses: u64,
    fallback_responses: u64,
    error_count: u64,
    error_types: BTreeMap<String, u64>,
    token_usage: TokenUsage,
    cost_tracking: CostTracking,
    response_times: VecDeque<u64>,
    slow_requests: u64,
    timeout_count: u64,
    average_response_time: f64,
}

/// Process-wide chat analytics, owned by the server's composition root
#[derive(Debug)]
pub struct MetricsAggregator {
    state: Mutex<MetricsState>,
    alerts: AlertBoard,
    thresholds: AlertThresholds,
    cost: CostCalculator,
    capacity: usize,
    slow_request_ms: u64,
    started: Instant,
    started_at: DateTime<Utc>,
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new(&AnalyticsConfig::default(), CostCalculator::default())
    }
}

impl MetricsAggregator {
    /// Create an aggregator with zeroed counters
    pub fn new(config: &AnalyticsConfig, cost: CostCalculator) -> Self {
        let capacity = config.response_time_capacity.max(1);
        Self {
            state: Mutex::new(MetricsState {
                response_times: VecDeque::with_capacity(capacity + 1),
                ..MetricsState::default()
            }),
            alerts: AlertBoard::new(),
            thresholds: AlertThresholds::from(config),
            cost,
            capacity,
            slow_request_ms: config.slow_request_ms,
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Count a new chat request; returns the updated total
    pub fn record_request_start(&self) -> u64 {
        let mut state = self.state.lock();
        state.total_requests += 1;
        state.total_requests
    }

    /// Count a completion-service answer and its token usage
    pub fn record_external_success(&self, tokens: u64) {
        let mut state = self.state.lock();
        state.external_responses += 1;
        let answered = state.external_responses as f64;

        let usage = &mut state.token_usage;
        usage.total += tokens;
        usage.average = usage.total as f64 / answered;
        usage.max = usage.max.max(tokens);
        usage.min = Some(usage.min.map_or(tokens, |min| min.min(tokens)));

        let tracking = &mut state.cost_tracking;
        tracking.total_cost += self.cost.cost(tokens);
        tracking.average_cost = tracking.total_cost / answered;

        self.evaluate_usage_alerts(&state);
        self.evaluate_error_spike(&state);
    }

    /// Count a canned-table answer
    pub fn record_fallback(&self) {
        self.state.lock().fallback_responses += 1;
    }

    /// Count an error under its classification
    pub fn record_error(&self, classification: &str) {
        let mut state = self.state.lock();
        state.error_count += 1;
        *state
            .error_types
            .entry(classification.to_string())
            .or_insert(0) += 1;

        self.evaluate_error_spike(&state);
    }

    /// Count an external call that lost the timeout race
    pub fn record_timeout(&self) {
        self.state.lock().timeout_count += 1;
    }

    /// Record the wall time of one chat request
    pub fn record_latency(&self, ms: u64) {
        let mut state = self.state.lock();

        state.response_times.push_back(ms);
        while state.response_times.len() > self.capacity {
            state.response_times.pop_front();
        }

        // Recency-weighted on purpose: halves the weight of history per sample
        state.average_response_time = (state.average_response_time + ms as f64) / 2.0;

        if ms > self.slow_request_ms {
            state.slow_requests += 1;
        }
    }

    /// Estimated cost of a completion of `tokens` tokens
    pub fn estimate_cost(&self, tokens: u64) -> f64 {
        self.cost.cost(tokens)
    }

    /// Number of chat requests seen so far
    pub fn total_requests(&self) -> u64 {
        self.state.lock().total_requests
    }

    /// Read-only summary of the current state
    pub fn snapshot(&self) -> AnalyticsSnapshot {
        self.snapshot_at(Instant::now())
    }

    fn snapshot_at(&self, now: Instant) -> AnalyticsSnapshot {
        let state = self.state.lock();

        let window_average = if state.response_times.is_empty() {
            0
        } else {
            (state.response_times.iter().sum::<u64>() as f64 / state.response_times.len() as f64)
                .round() as u64
        };

        AnalyticsSnapshot {
            uptime: format_uptime(now.saturating_duration_since(self.started).as_secs()),
            started_at: self.started_at,
            total_requests: state.total_requests,
            external_responses: state.external_responses,
            fallback_responses: state.fallback_responses,
            error_count: state.error_count,
            external_percentage: percentage(state.external_responses, state.total_requests),
            fallback_percentage: percentage(state.fallback_responses, state.total_requests),
            token_usage: state.token_usage.clone(),
            cost_tracking: CostTracking {
                cost_per_request: if state.total_requests == 0 {
                    0.0
                } else {
                    state.cost_tracking.total_cost / state.total_requests as f64
                },
                ..state.cost_tracking.clone()
            },
            performance: PerformanceSummary {
                average_response_time: state.average_response_time.round() as u64,
                window_average_response_time: window_average,
                slow_requests: state.slow_requests,
                timeout_count: state.timeout_count,
                recent_response_times: state.response_times.iter().copied().collect(),
            },
            alerts: self.alerts.flags(),
            error_types: state.error_types.clone(),
        }
    }

    fn evaluate_usage_alerts(&self, state: &MetricsState) {
        if state.token_usage.average > self.thresholds.token_average
            && self.alerts.raise(AlertKind::HighTokenUsage)
        {
            warn!(
                alert_type = %AlertKind::HighTokenUsage,
                average_tokens = state.token_usage.average,
                total_tokens = state.token_usage.total,
                "High token usage detected"
            );
        }

        if state.cost_tracking.average_cost > self.thresholds.cost_average
            && self.alerts.raise(AlertKind::HighCost)
        {
            warn!(
                alert_type = %AlertKind::HighCost,
                average_cost = state.cost_tracking.average_cost,
                total_cost = state.cost_tracking.total_cost,
                "High cost per request detected"
            );
        }
    }

    fn evaluate_error_spike(&self, state: &MetricsState) {
        if state.total_requests == 0 {
            return;
        }

        let error_rate = state.error_count as f64 / state.total_requests as f64 * 100.0;
        if error_rate > self.thresholds.error_rate && self.alerts.raise(AlertKind::ErrorSpike) {
            error!(
                alert_type = %AlertKind::ErrorSpike,
                error_rate,
                total_errors = state.error_count,
                total_requests = state.total_requests,
                "High error rate detected"
            );
        }
    }
}

/// Rounded percentage, 0 when there is nothing to divide by
fn percentage(part: u64, total: u64) -> u64 {
    if total == 0 {
        0
    } else {
        (part as f64 / total as f64 * 100.0).round() as u64
    }
}

fn format_uptime(secs: u64) -> String {
    format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn aggregator_with_capacity(capacity: usize) -> MetricsAggregator {
        let config = AnalyticsConfig {
            response_time_capacity: capacity,
            ..AnalyticsConfig::default()
        };
        MetricsAggregator::new(&config, CostCalculator::default())
    }

    #[test]
    fn test_token_usage_statistics() {
        let metrics = MetricsAggregator::default();
        for tokens in [100, 200, 300, 400, 500] {
            metrics.record_request_start();
            metrics.record_external_success(tokens);
        }

        let usage = metrics.snapshot().token_usage;
        assert_eq!(usage.total, 1500);
        assert_eq!(usage.average, 300.0);
        assert_eq!(usage.max, 500);
        assert_eq!(usage.min, Some(100));
    }

    #[test]
    fn test_min_is_unset_before_first_completion() {
        let metrics = MetricsAggregator::default();
        assert_eq!(metrics.snapshot().token_usage.min, None);
    }

    #[test]
    fn test_high_token_usage_alert_is_sticky() {
        let metrics = MetricsAggregator::default();

        metrics.record_request_start();
        metrics.record_external_success(600);
        assert!(metrics.snapshot().alerts.high_token_usage);

        // average drops to 300.5, the flag stays raised
        metrics.record_request_start();
        metrics.record_external_success(1);
        let snapshot = metrics.snapshot();
        assert!(snapshot.token_usage.average < 500.0);
        assert!(snapshot.alerts.high_token_usage);
    }

    #[test]
    fn test_high_cost_alert() {
        let metrics = MetricsAggregator::new(&AnalyticsConfig::default(), CostCalculator::new(1.0));

        metrics.record_request_start();
        metrics.record_external_success(50);
        assert!(!metrics.snapshot().alerts.high_cost);

        // average cost (0.05 + 0.25) / 2 = 0.15
        metrics.record_request_start();
        metrics.record_external_success(250);
        let snapshot = metrics.snapshot();
        assert!(snapshot.alerts.high_cost);
        assert!((snapshot.cost_tracking.total_cost - 0.3).abs() < 1e-9);
        assert!((snapshot.cost_tracking.average_cost - 0.15).abs() < 1e-9);
        assert!((snapshot.cost_tracking.cost_per_request - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_cost_tracking_uses_fixed_rate() {
        let metrics = MetricsAggregator::default();
        metrics.record_request_start();
        metrics.record_external_success(1000);

        let cost = metrics.snapshot().cost_tracking;
        assert!((cost.total_cost - 0.002).abs() < 1e-12);
        assert!((cost.average_cost - 0.002).abs() < 1e-12);
    }

    #[test]
    fn test_error_spike_alert() {
        let metrics = MetricsAggregator::default();
        for _ in 0..5 {
            metrics.record_request_start();
        }

        // 1 of 5 = 20%, not above the threshold
        metrics.record_error("rate_limit");
        assert!(!metrics.snapshot().alerts.error_spike);

        metrics.record_error("rate_limit");
        let snapshot = metrics.snapshot();
        assert!(snapshot.alerts.error_spike);
        assert_eq!(snapshot.error_count, 2);
        assert_eq!(snapshot.error_types.get("rate_limit"), Some(&2));
    }

    #[test]
    fn test_error_without_requests_does_not_divide_by_zero() {
        let metrics = MetricsAggregator::default();
        metrics.record_error("unknown");

        let snapshot = metrics.snapshot();
        assert!(!snapshot.alerts.error_spike);
        assert_eq!(snapshot.error_types.get("unknown"), Some(&1));
    }

    #[test]
    fn test_response_time_window_keeps_latest() {
        let metrics = aggregator_with_capacity(50);
        for ms in 1..=60 {
            metrics.record_latency(ms);
        }

        let recent = metrics.snapshot().performance.recent_response_times;
        assert_eq!(recent.len(), 50);
        assert_eq!(recent.first(), Some(&11));
        assert_eq!(recent.last(), Some(&60));
    }

    #[test]
    fn test_parallel_recording_loses_no_updates() {
        let metrics = aggregator_with_capacity(100);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..250 {
                        metrics.record_request_start();
                        metrics.record_external_success(10);
                        metrics.record_latency(5);
                    }
                });
            }
        });

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 2000);
        assert_eq!(snapshot.external_responses, 2000);
        assert_eq!(snapshot.token_usage.total, 20_000);
        assert_eq!(snapshot.performance.recent_response_times.len(), 100);
    }

    #[test]
    fn test_recency_weighted_average_and_slow_requests() {
        let metrics = MetricsAggregator::default();

        metrics.record_latency(800);
        assert_eq!(metrics.snapshot().performance.average_response_time, 400);

        metrics.record_latency(3000);
        metrics.record_latency(3001);
        let performance = metrics.snapshot().performance;
        // ((400 + 3000) / 2 + 3001) / 2 = 2350.5
        assert_eq!(performance.average_response_time, 2351);
        assert_eq!(performance.window_average_response_time, 2267);
        assert_eq!(performance.slow_requests, 1);
    }

    #[test]
    fn test_percentages_are_zero_without_requests() {
        let snapshot = MetricsAggregator::default().snapshot();

        assert_eq!(snapshot.total_requests, 0);
        assert_eq!(snapshot.external_percentage, 0);
        assert_eq!(snapshot.fallback_percentage, 0);
        assert_eq!(snapshot.uptime, "0h 0m");
    }

    #[test]
    fn test_percentages_are_rounded() {
        let metrics = MetricsAggregator::default();
        for _ in 0..3 {
            metrics.record_request_start();
        }
        metrics.record_external_success(10);
        metrics.record_fallback();
        metrics.record_fallback();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.external_percentage, 33);
        assert_eq!(snapshot.fallback_percentage, 67);
    }

    #[test]
    fn test_snapshot_is_idempotent() {
        let metrics = MetricsAggregator::default();
        metrics.record_request_start();
        metrics.record_external_success(120);
        metrics.record_error("server_error");
        metrics.record_latency(950);

        let now = Instant::now();
        let first = metrics.snapshot_at(now);
        let second = metrics.snapshot_at(now);

        assert_eq!(first, second);
        assert_eq!(metrics.total_requests(), 1);
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(59), "0h 0m");
        assert_eq!(format_uptime(3 * 3600 + 25 * 60 + 10), "3h 25m");
    }

    #[derive(Debug, Clone)]
    enum Op {
        Start,
        Success(u64),
        Fallback,
        Error,
        Latency(u64),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Start),
            (0u64..2_000).prop_map(Op::Success),
            Just(Op::Fallback),
            Just(Op::Error),
            (0u64..5_000).prop_map(Op::Latency),
        ]
    }

    proptest! {
        #[test]
        fn prop_window_never_exceeds_capacity(
            capacity in 1usize..20,
            samples in proptest::collection::vec(0u64..10_000, 0..100),
        ) {
            let metrics = aggregator_with_capacity(capacity);
            for ms in &samples {
                metrics.record_latency(*ms);
            }

            let recent = metrics.snapshot().performance.recent_response_times;
            prop_assert!(recent.len() <= capacity);
            let expected: Vec<u64> = samples.iter().rev().take(capacity).rev().copied().collect();
            prop_assert_eq!(recent, expected);
        }

        #[test]
        fn prop_alert_flags_are_monotonic(ops in proptest::collection::vec(op_strategy(), 1..80)) {
            let metrics = MetricsAggregator::new(&AnalyticsConfig::default(), CostCalculator::new(0.5));
            let mut previous = metrics.snapshot().alerts;

            for op in ops {
                match op {
                    Op::Start => { metrics.record_request_start(); }
                    Op::Success(tokens) => metrics.record_external_success(tokens),
                    Op::Fallback => metrics.record_fallback(),
                    Op::Error => metrics.record_error("unknown"),
                    Op::Latency(ms) => metrics.record_latency(ms),
                }

                let current = metrics.snapshot().alerts;
                prop_assert!(!previous.high_token_usage || current.high_token_usage);
                prop_assert!(!previous.high_cost || current.high_cost);
                prop_assert!(!previous.error_spike || current.error_spike);
                previous = current;
            }
        }
    }
}
