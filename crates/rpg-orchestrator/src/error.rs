//! Error classification for the orchestrator (§7): `Configuration` is always fatal and occurs
//! only before a job exists; every other variant is attached to the job that produced it.

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("job was cancelled")]
    Cancelled,
    #[error(transparent)]
    Graph(#[from] rpg_core::error::GraphError),
    #[error("sandbox error: {0}")]
    Sandbox(#[from] rpg_sandbox::SandboxError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
