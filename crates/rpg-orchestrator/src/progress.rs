//! A progress sink the orchestrator reports through, generalizing the corpus's terminal
//! progress-bar abstraction (`rpg_llm::PipelineProgress`) to an arbitrary observer so the HTTP
//! façade can poll a job's progress instead of rendering to a terminal.

use rpg_core::job::Stage;

pub trait ProgressSink: Send + Sync {
    fn on_stage_start(&self, stage: Stage, progress: u8);
    fn on_codegen_node(&self, completed: usize, total: usize);
}

/// Discards every event; the default for headless/batch runs.
#[derive(Debug, Default)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn on_stage_start(&self, _stage: Stage, _progress: u8) {}
    fn on_codegen_node(&self, _completed: usize, _total: usize) {}
}

/// Emits a `tracing` event per transition, for runs where a terminal or log aggregator is the
/// consumer rather than a polling HTTP client.
#[derive(Debug, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn on_stage_start(&self, stage: Stage, progress: u8) {
        tracing::info!(?stage, progress, "stage started");
    }

    fn on_codegen_node(&self, completed: usize, total: usize) {
        tracing::debug!(completed, total, "codegen node completed");
    }
}
