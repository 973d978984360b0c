//! Container backend: shells out to an external `docker` binary via `tokio::process::Command`.

use crate::error::SandboxError;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

const BASE_IMAGE: &str = "python:3.11-slim";

/// True once, at sandbox construction: whether `docker` resolves on `PATH`.
#[must_use]
pub fn probe() -> bool {
    std::process::Command::new("which")
        .arg("docker")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Runs `command` inside a disposable container with the workspace bind-mounted read-write,
/// network disabled, and the given resource caps.
pub async fn run(
    workspace: &Path,
    command: &[String],
    memory_mb: u64,
    timeout: Duration,
) -> Result<(i32, String), SandboxError> {
    let mount = format!("{}:/project", workspace.display());
    let shell_command = command.join(" && ");

    let mut cmd = tokio::process::Command::new("docker");
    cmd.args([
        "run",
        "--rm",
        "--network",
        "none",
        "--cpus",
        "1",
        "--memory",
        &format!("{memory_mb}m"),
        "-v",
        &mount,
        "-w",
        "/project",
        BASE_IMAGE,
        "bash",
        "-c",
        &shell_command,
    ]);
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let child = cmd.spawn().map_err(SandboxError::Spawn)?;
    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| SandboxError::Timeout(timeout.as_secs()))?
        .map_err(SandboxError::Spawn)?;

    let mut merged = String::from_utf8_lossy(&output.stdout).into_owned();
    merged.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok((output.status.code().unwrap_or(-1), merged))
}
