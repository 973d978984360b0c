//! Cost tracking for the LLM gateway. Purely observability: never gates behavior.

use crate::provider::LlmProvider;

/// Running cost tracker accumulating input/output token usage across a run.
#[derive(Debug, Default)]
pub struct CostTracker {
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    input_rate: f64,
    output_rate: f64,
}

impl CostTracker {
    #[must_use]
    pub fn new(provider: &dyn LlmProvider) -> Self {
        Self {
            total_input_tokens: 0,
            total_output_tokens: 0,
            input_rate: provider.cost_per_mtok_input(),
            output_rate: provider.cost_per_mtok_output(),
        }
    }

    pub fn record(&mut self, input_tokens: Option<u64>, output_tokens: Option<u64>) {
        if let Some(t) = input_tokens {
            self.total_input_tokens += t;
        }
        if let Some(t) = output_tokens {
            self.total_output_tokens += t;
        }
    }

    #[must_use]
    pub fn total_cost_usd(&self) -> f64 {
        (self.total_input_tokens as f64 / 1_000_000.0) * self.input_rate
            + (self.total_output_tokens as f64 / 1_000_000.0) * self.output_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::DeterministicProvider;

    #[test]
    fn tracker_accumulates_free_provider_usage() {
        let provider = DeterministicProvider::new(vec!["x".to_string()]);
        let mut tracker = CostTracker::new(&provider);
        tracker.record(Some(100), Some(50));
        assert_eq!(tracker.total_cost_usd(), 0.0);
    }
}
