//! The single `generate` operation (§4.3) wrapping a pluggable [`LlmProvider`].

use crate::cost::CostTracker;
use crate::provider::{LlmProvider, ProviderError};
use std::sync::Mutex;

/// Token usage reported by a single `generate` call.
#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// The result of a `generate` call: content plus usage, regardless of outcome.
pub struct GenerateResult {
    pub content: String,
    pub usage: Usage,
    pub ok: bool,
    pub err: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("model returned invalid JSON after fence-stripping: {0}")]
    InvalidJson(#[source] serde_json::Error),
}

/// The LLM gateway: one operation, no internal retry. Callers own the repair/retry decision.
pub struct LlmGateway {
    provider: Box<dyn LlmProvider>,
    cost: Mutex<CostTracker>,
}

impl LlmGateway {
    #[must_use]
    pub fn new(provider: Box<dyn LlmProvider>) -> Self {
        let cost = CostTracker::new(provider.as_ref());
        Self {
            provider,
            cost: Mutex::new(cost),
        }
    }

    /// Run a completion and record usage, never retrying transient failures internally.
    pub fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
        system: Option<&str>,
    ) -> GenerateResult {
        match self.provider.complete(system, prompt, temperature, max_tokens) {
            Ok(response) => {
                self.cost
                    .lock()
                    .expect("lock poisoned")
                    .record(response.input_tokens, response.output_tokens);
                GenerateResult {
                    content: response.text,
                    usage: Usage {
                        input_tokens: response.input_tokens.unwrap_or(0),
                        output_tokens: response.output_tokens.unwrap_or(0),
                    },
                    ok: true,
                    err: None,
                }
            }
            Err(err) => GenerateResult {
                content: String::new(),
                usage: Usage::default(),
                ok: false,
                err: Some(err.to_string()),
            },
        }
    }

    /// Appends a strict-JSON-output directive to the prompt, strips fenced code markers from
    /// the response, and parses. Raises rather than silently returning malformed output.
    pub fn generate_json(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
        system: Option<&str>,
    ) -> Result<(serde_json::Value, Usage), GatewayError> {
        let strict_prompt =
            format!("{prompt}\n\nRespond with strict JSON only, no prose, no markdown fences.");
        let result = self.generate(&strict_prompt, temperature, max_tokens, system);
        if !result.ok {
            return Err(GatewayError::Provider(ProviderError::Http(
                result.err.unwrap_or_default(),
            )));
        }
        let stripped = strip_json_fences(&result.content);
        let value = serde_json::from_str(&stripped).map_err(GatewayError::InvalidJson)?;
        Ok((value, result.usage))
    }

    #[must_use]
    pub fn total_cost_usd(&self) -> f64 {
        self.cost.lock().expect("lock poisoned").total_cost_usd()
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }
}

fn strip_json_fences(text: &str) -> String {
    let trimmed = text.trim();
    let without_lang = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_lang.strip_suffix("```").unwrap_or(without_lang).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::DeterministicProvider;

    #[test]
    fn generate_reports_usage_on_success() {
        let gateway = LlmGateway::new(Box::new(DeterministicProvider::new(vec![
            "hello".to_string(),
        ])));
        let result = gateway.generate("say hi", 0.1, 100, None);
        assert!(result.ok);
        assert_eq!(result.content, "hello");
        assert_eq!(result.usage.input_tokens, 100);
    }

    #[test]
    fn generate_json_strips_fences_and_parses() {
        let gateway = LlmGateway::new(Box::new(DeterministicProvider::new(vec![
            "```json\n{\"features\": [\"a\", \"b\"]}\n```".to_string(),
        ])));
        let (value, _) = gateway.generate_json("list features", 0.1, 100, None).unwrap();
        assert_eq!(value["features"][0], "a");
    }

    #[test]
    fn generate_json_raises_on_malformed_output() {
        let gateway = LlmGateway::new(Box::new(DeterministicProvider::new(vec![
            "not json".to_string(),
        ])));
        assert!(gateway.generate_json("list features", 0.1, 100, None).is_err());
    }

    #[test]
    fn cost_accumulates_across_calls() {
        let gateway = LlmGateway::new(Box::new(DeterministicProvider::new(vec![
            "a".to_string(),
            "b".to_string(),
        ])));
        gateway.generate("p1", 0.1, 100, None);
        gateway.generate("p2", 0.1, 100, None);
        assert_eq!(gateway.total_cost_usd(), 0.0);
    }
}
