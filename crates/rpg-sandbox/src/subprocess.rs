//! Native subprocess backend: used when `docker` is unavailable on `PATH`.
//!
//! Offers the same observable contract as the container backend (merged stdout/stderr, exit
//! code, wall-clock timeout) but without network/memory isolation — callers must not depend on
//! which backend actually served a call.

use crate::error::SandboxError;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

pub async fn run(
    workspace: &Path,
    steps: &[String],
    timeout: Duration,
) -> Result<(i32, String), SandboxError> {
    let shell_command = steps.join(" && ");
    let mut cmd = tokio::process::Command::new("bash");
    cmd.args(["-c", &shell_command])
        .current_dir(workspace)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let child = cmd.spawn().map_err(SandboxError::Spawn)?;
    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| SandboxError::Timeout(timeout.as_secs()))?
        .map_err(SandboxError::Spawn)?;

    let mut merged = String::from_utf8_lossy(&output.stdout).into_owned();
    merged.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok((output.status.code().unwrap_or(-1), merged))
}
