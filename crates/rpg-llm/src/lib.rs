//! LLM gateway: a single `generate` operation behind a pluggable, cost-tracked provider.
//!
//! # Architecture
//!
//! - **provider**: `LlmProvider` trait with Anthropic, OpenAI, and deterministic implementations
//! - **gateway**: `generate`/`generate_json`, no internal retry
//! - **cost**: running cost tracking (USD, purely observability)
//! - **progress**: terminal progress bars via `indicatif`, used by the CLI

pub mod cost;
pub mod gateway;
pub mod progress;
pub mod provider;

pub use cost::CostTracker;
pub use gateway::{GatewayError, GenerateResult, LlmGateway, Usage};
pub use progress::PipelineProgress;
pub use provider::{DeterministicProvider, LlmProvider, ProviderError, available_providers, create_provider};
