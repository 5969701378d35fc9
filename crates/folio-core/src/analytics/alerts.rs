//! Sticky one-shot alerts
//!
//! Each alert moves from unset to set at most once per process. Raising is a
//! compare-and-set, so concurrent evaluators agree on exactly one winner and
//! only that caller logs the alert.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::AnalyticsConfig;
use crate::models::AlertFlags;

/// A flag that can be raised once and never cleared
#[derive(Debug, Default)]
pub struct StickyAlert {
    raised: AtomicBool,
}

impl StickyAlert {
    /// Create an unset alert
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the alert; returns true only for the call that actually set it
    pub fn raise(&self) -> bool {
        self.raised
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Whether the alert has been raised
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}

/// The alerts tracked for chat analytics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    /// Average tokens per completion too high
    HighTokenUsage,
    /// Average cost per completion too high
    HighCost,
    /// Error rate too high
    ErrorSpike,
}

impl AlertKind {
    /// Stable name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighTokenUsage => "high_token_usage",
            Self::HighCost => "high_cost",
            Self::ErrorSpike => "error_spike",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trip points for the alerts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertThresholds {
    /// Average tokens per external response
    pub token_average: f64,
    /// Average cost per external response
    pub cost_average: f64,
    /// Error percentage of all requests
    pub error_rate: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self::from(&AnalyticsConfig::default())
    }
}

impl From<&AnalyticsConfig> for AlertThresholds {
    fn from(config: &AnalyticsConfig) -> Self {
        Self {
            token_average: config.token_average_threshold,
            cost_average: config.cost_average_threshold,
            error_rate: config.error_rate_threshold,
        }
    }
}

/// All sticky alerts of one aggregator
#[derive(Debug, Default)]
pub struct AlertBoard {
    high_token_usage: StickyAlert,
    high_cost: StickyAlert,
    error_spike: StickyAlert,
}

impl AlertBoard {
    /// Create a board with every alert unset
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise one alert; true if this call set it
    pub fn raise(&self, kind: AlertKind) -> bool {
        self.alert(kind).raise()
    }

    /// Whether one alert is raised
    pub fn is_raised(&self, kind: AlertKind) -> bool {
        self.alert(kind).is_raised()
    }

    /// Current state of every alert
    pub fn flags(&self) -> AlertFlags {
        AlertFlags {
            high_token_usage: self.high_token_usage.is_raised(),
            high_cost: self.high_cost.is_raised(),
            error_spike: self.error_spike.is_raised(),
        }
    }

    fn alert(&self, kind: AlertKind) -> &StickyAlert {
        match kind {
            AlertKind::HighTokenUsage => &self.high_token_usage,
            AlertKind::HighCost => &self.high_cost,
            AlertKind::ErrorSpike => &self.error_spike,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_raise_succeeds_once() {
        let alert = StickyAlert::new();
        assert!(!alert.is_raised());

        assert!(alert.raise());
        assert!(!alert.raise());
        assert!(alert.is_raised());
    }

    #[test]
    fn test_concurrent_raise_has_single_winner() {
        let alert = StickyAlert::new();
        let winners = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    if alert.raise() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert!(alert.is_raised());
    }

    #[test]
    fn test_board_flags_are_independent() {
        let board = AlertBoard::new();
        board.raise(AlertKind::HighCost);

        let flags = board.flags();
        assert!(flags.high_cost);
        assert!(!flags.high_token_usage);
        assert!(!flags.error_spike);
        assert!(board.is_raised(AlertKind::HighCost));
    }
}
