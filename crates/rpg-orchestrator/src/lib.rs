//! Sequences the Proposal, Implementation, and Codegen controllers behind a single `Job`
//! record, the way the teacher's CLI sequenced its own pipeline stages end to end — generalized
//! here so the same sequencing can be driven from either the CLI or the HTTP façade.

pub mod cancellation;
pub mod error;
pub mod orchestrator;
pub mod progress;

pub use cancellation::CancellationToken;
pub use error::OrchestratorError;
pub use orchestrator::Orchestrator;
pub use progress::{NoopSink, ProgressSink, TracingSink};
