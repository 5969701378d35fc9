//! Cost calculator for completion calls
//!
//! Estimates spend from the total token count reported by the completion
//! service, using a blended price per 1000 tokens.

/// Rate applied when the model is not in the pricing table
pub const DEFAULT_RATE_PER_1K: f64 = 0.002;

/// Blended price per 1000 tokens, most specific model names first
const MODEL_PRICING: &[(&str, f64)] = &[
    ("gpt-3.5-turbo", 0.002),
    ("gpt-4o-mini", 0.000_6),
    ("gpt-4o", 0.01),
    ("gpt-4-turbo", 0.03),
    ("gpt-4", 0.06),
];

/// Converts token counts to an estimated cost
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostCalculator {
    rate_per_1k: f64,
}

impl Default for CostCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_PER_1K)
    }
}

impl CostCalculator {
    /// Create a calculator with a fixed rate per 1000 tokens
    pub fn new(rate_per_1k: f64) -> Self {
        Self { rate_per_1k }
    }

    /// Create a calculator for a model; an explicit rate wins over the table
    pub fn for_model(model: &str, rate_override: Option<f64>) -> Self {
        if let Some(rate) = rate_override {
            return Self::new(rate);
        }

        match find_rate(model) {
            Some(rate) => Self::new(rate),
            None => {
                tracing::debug!(model, "Unknown model for cost calculation, using default rate");
                Self::default()
            }
        }
    }

    /// Estimated cost of `tokens` tokens
    pub fn cost(&self, tokens: u64) -> f64 {
        tokens as f64 / 1000.0 * self.rate_per_1k
    }

    /// The rate in use
    pub fn rate_per_1k(&self) -> f64 {
        self.rate_per_1k
    }
}

/// Find the rate for a model by exact name, then by prefix
/// (e.g. "gpt-4o-2024-08-06" matches "gpt-4o")
fn find_rate(model: &str) -> Option<f64> {
    MODEL_PRICING
        .iter()
        .find(|(name, _)| *name == model)
        .or_else(|| MODEL_PRICING.iter().find(|(name, _)| model.starts_with(*name)))
        .map(|(_, rate)| *rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_at_default_rate() {
        let calculator = CostCalculator::default();

        // 1000 tokens at $0.002/1K
        assert!((calculator.cost(1000) - 0.002).abs() < 1e-12);
        // 250 tokens at $0.002/1K = $0.0005
        assert!((calculator.cost(250) - 0.0005).abs() < 1e-12);
        assert_eq!(calculator.cost(0), 0.0);
    }

    #[test]
    fn test_versioned_model_uses_prefix_pricing() {
        let calculator = CostCalculator::for_model("gpt-4o-2024-08-06", None);
        assert!((calculator.rate_per_1k() - 0.01).abs() < 1e-12);

        let mini = CostCalculator::for_model("gpt-4o-mini-2024-07-18", None);
        assert!((mini.rate_per_1k() - 0.000_6).abs() < 1e-12);
    }

    #[test]
    fn test_override_wins_over_table() {
        let calculator = CostCalculator::for_model("gpt-4", Some(0.5));
        assert!((calculator.rate_per_1k() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_model_uses_default_rate() {
        let calculator = CostCalculator::for_model("mistral-small", None);
        assert!((calculator.rate_per_1k() - DEFAULT_RATE_PER_1K).abs() < 1e-12);
    }
}
