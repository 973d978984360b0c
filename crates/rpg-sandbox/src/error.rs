//! Sandbox-category errors (§7): never fatal, always carry enough context to fall back.

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("docker not available on PATH: {reason}")]
    DockerUnavailable { reason: String },
    #[error("failed to prepare isolated workspace: {0}")]
    Workspace(#[source] std::io::Error),
    #[error("failed to spawn test process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("execution exceeded the {0}s wall-clock timeout")]
    Timeout(u64),
    #[error("test file not found: {0}")]
    MissingTestFile(String),
}
