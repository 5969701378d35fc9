//! Chat analytics
//!
//! Counts every chat request and completion call, estimates spend, and raises
//! sticky alerts when usage, cost or error rates run high.

mod aggregator;
mod alerts;
mod cost;

pub use aggregator::MetricsAggregator;
pub use alerts::{AlertBoard, AlertKind, AlertThresholds, StickyAlert};
pub use cost::{CostCalculator, DEFAULT_RATE_PER_1K};
