//! LLM provider abstraction behind the gateway's single `complete` primitive.
//!
//! Supports Anthropic (Claude Haiku) and OpenAI-compatible (GPT-4o-mini) APIs via blocking
//! HTTP (`ureq`) — callers that run inside an async context dispatch through
//! `tokio::task::spawn_blocking`. A deterministic scripted provider stands in for both during
//! tests and any environment without a live model.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Errors from LLM provider calls.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("response parse error: {0}")]
    Parse(String),
    #[error("empty response from LLM")]
    EmptyResponse,
    #[error("scripted provider exhausted its response sequence")]
    ScriptExhausted,
}

/// A completed LLM response.
pub struct LlmResponse {
    pub text: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// Abstraction over LLM API providers, mirroring the corpus's multi-provider pattern: a
/// hosted-API provider behind a feature flag, a deterministic provider for tests.
pub trait LlmProvider: Send + Sync {
    fn complete(
        &self,
        system: Option<&str>,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<LlmResponse, ProviderError>;

    /// The model name (for display/logging).
    fn model_name(&self) -> &str;

    /// Cost per million input tokens (USD).
    fn cost_per_mtok_input(&self) -> f64;

    /// Cost per million output tokens (USD).
    fn cost_per_mtok_output(&self) -> f64;
}

// ---------------------------------------------------------------------------
// Anthropic Messages API
// ---------------------------------------------------------------------------

#[cfg(feature = "anthropic")]
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    agent: ureq::Agent,
}

#[cfg(feature = "anthropic")]
impl AnthropicProvider {
    pub const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";
    const API_URL: &str = "https://api.anthropic.com/v1/messages";

    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self {
            api_key,
            model: model.unwrap_or_else(|| Self::DEFAULT_MODEL.to_string()),
            agent: ureq::Agent::new_with_config(
                ureq::config::Config::builder()
                    .timeout_global(Some(std::time::Duration::from_secs(120)))
                    .build(),
            ),
        }
    }
}

#[cfg(feature = "anthropic")]
impl LlmProvider for AnthropicProvider {
    fn complete(
        &self,
        system: Option<&str>,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<LlmResponse, ProviderError> {
        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "temperature": temperature,
            "messages": [
                {"role": "user", "content": prompt}
            ]
        });
        if let Some(system) = system {
            body["system"] = serde_json::Value::String(system.to_string());
        }

        let mut response = self
            .agent
            .post(Self::API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .send_json(&body)
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        let json: serde_json::Value = response
            .body_mut()
            .read_json()
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        if let Some(err) = json.get("error") {
            return Err(ProviderError::Api {
                status: 400,
                message: err
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }

        let text = json
            .get("content")
            .and_then(|c| c.as_array())
            .and_then(|arr| {
                arr.iter()
                    .find_map(|block| block.get("text").and_then(|t| t.as_str()))
            })
            .ok_or(ProviderError::EmptyResponse)?
            .to_string();

        let input_tokens = json
            .get("usage")
            .and_then(|u| u.get("input_tokens"))
            .and_then(serde_json::Value::as_u64);
        let output_tokens = json
            .get("usage")
            .and_then(|u| u.get("output_tokens"))
            .and_then(serde_json::Value::as_u64);

        Ok(LlmResponse {
            text,
            input_tokens,
            output_tokens,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn cost_per_mtok_input(&self) -> f64 {
        if self.model.contains("haiku") {
            0.80
        } else if self.model.contains("sonnet") {
            3.00
        } else {
            1.00
        }
    }

    fn cost_per_mtok_output(&self) -> f64 {
        if self.model.contains("haiku") {
            4.00
        } else if self.model.contains("sonnet") {
            15.00
        } else {
            5.00
        }
    }
}

// ---------------------------------------------------------------------------
// OpenAI Chat Completions API
// ---------------------------------------------------------------------------

#[cfg(feature = "openai")]
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    base_url: String,
    agent: ureq::Agent,
}

#[cfg(feature = "openai")]
impl OpenAiProvider {
    pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
    const DEFAULT_BASE_URL: &str = "https://api.openai.com";

    pub fn new(api_key: String, model: Option<String>, base_url: Option<String>) -> Self {
        Self {
            api_key,
            model: model.unwrap_or_else(|| Self::DEFAULT_MODEL.to_string()),
            base_url: base_url.unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string()),
            agent: ureq::Agent::new_with_config(
                ureq::config::Config::builder()
                    .timeout_global(Some(std::time::Duration::from_secs(120)))
                    .build(),
            ),
        }
    }
}

#[cfg(feature = "openai")]
impl LlmProvider for OpenAiProvider {
    fn complete(
        &self,
        system: Option<&str>,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<LlmResponse, ProviderError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        );

        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(serde_json::json!({"role": "system", "content": system}));
        }
        messages.push(serde_json::json!({"role": "user", "content": prompt}));

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "temperature": temperature,
            "messages": messages,
        });

        let mut response = self
            .agent
            .post(&url)
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .send_json(&body)
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        let json: serde_json::Value = response
            .body_mut()
            .read_json()
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        if let Some(err) = json.get("error") {
            return Err(ProviderError::Api {
                status: 400,
                message: err
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }

        let text = json
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|msg| msg.get("content"))
            .and_then(|c| c.as_str())
            .ok_or(ProviderError::EmptyResponse)?
            .to_string();

        let input_tokens = json
            .get("usage")
            .and_then(|u| u.get("prompt_tokens"))
            .and_then(serde_json::Value::as_u64);
        let output_tokens = json
            .get("usage")
            .and_then(|u| u.get("completion_tokens"))
            .and_then(serde_json::Value::as_u64);

        Ok(LlmResponse {
            text,
            input_tokens,
            output_tokens,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn cost_per_mtok_input(&self) -> f64 {
        if self.model.contains("4o-mini") {
            0.15
        } else if self.model.contains("4o") {
            2.50
        } else {
            0.50
        }
    }

    fn cost_per_mtok_output(&self) -> f64 {
        if self.model.contains("4o-mini") {
            0.60
        } else if self.model.contains("4o") {
            10.00
        } else {
            1.50
        }
    }
}

// ---------------------------------------------------------------------------
// Deterministic scripted provider (test double)
// ---------------------------------------------------------------------------

/// Returns a pre-programmed sequence of responses, one per call; the last entry repeats once
/// the sequence is exhausted rather than erroring, so long-running repair loops don't need an
/// oversized script. Exercises the repair loop (S5) and the full-pipeline reproducibility
/// invariant (S8) without a live model.
pub struct DeterministicProvider {
    responses: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl DeterministicProvider {
    #[must_use]
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses),
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LlmProvider for DeterministicProvider {
    fn complete(
        &self,
        _system: Option<&str>,
        _prompt: &str,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<LlmResponse, ProviderError> {
        let responses = self.responses.lock().expect("lock poisoned");
        if responses.is_empty() {
            return Err(ProviderError::ScriptExhausted);
        }
        let idx = self.calls.fetch_add(1, Ordering::SeqCst).min(responses.len() - 1);
        Ok(LlmResponse {
            text: responses[idx].clone(),
            input_tokens: Some(100),
            output_tokens: Some(50),
        })
    }

    fn model_name(&self) -> &str {
        "deterministic"
    }

    fn cost_per_mtok_input(&self) -> f64 {
        0.0
    }

    fn cost_per_mtok_output(&self) -> f64 {
        0.0
    }
}

/// Create a provider from CLI/config arguments.
pub fn create_provider(
    provider_name: &str,
    api_key: &str,
    model: Option<&str>,
    base_url: Option<&str>,
) -> Result<Box<dyn LlmProvider>, ProviderError> {
    match provider_name {
        #[cfg(feature = "anthropic")]
        "anthropic" => Ok(Box::new(AnthropicProvider::new(
            api_key.to_string(),
            model.map(String::from),
        ))),
        #[cfg(feature = "openai")]
        "openai" => Ok(Box::new(OpenAiProvider::new(
            api_key.to_string(),
            model.map(String::from),
            base_url.map(String::from),
        ))),
        "deterministic" => Ok(Box::new(DeterministicProvider::new(vec![
            "{}".to_string(),
        ]))),
        other => Err(ProviderError::Http(format!(
            "unknown provider: '{}'. Available: {}",
            other,
            available_providers().join(", ")
        ))),
    }
}

/// List compiled-in provider names.
pub fn available_providers() -> Vec<&'static str> {
    vec![
        #[cfg(feature = "anthropic")]
        "anthropic",
        #[cfg(feature = "openai")]
        "openai",
        "deterministic",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_provider_cycles_through_script() {
        let provider = DeterministicProvider::new(vec!["first".to_string(), "second".to_string()]);
        let a = provider.complete(None, "p", 0.1, 100).unwrap();
        let b = provider.complete(None, "p", 0.1, 100).unwrap();
        let c = provider.complete(None, "p", 0.1, 100).unwrap();
        assert_eq!(a.text, "first");
        assert_eq!(b.text, "second");
        assert_eq!(c.text, "second");
    }
}
