//! Ties backend selection, workspace isolation, and output parsing into one call per §4.4.

use crate::error::SandboxError;
use crate::parse::parse_test_counts;
use crate::profile;
use crate::{docker, subprocess, workspace};
use rpg_core::config::SandboxConfig;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// The outcome of running one or more test files.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub ok: bool,
    pub output: String,
    pub exit_code: i32,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

/// Probes for `docker` once at construction; every call thereafter uses whichever backend was
/// found, falling back to the subprocess backend silently (a Sandbox-category error, never
/// fatal).
pub struct SandboxRunner {
    config: SandboxConfig,
    docker_available: bool,
}

impl SandboxRunner {
    #[must_use]
    pub fn new(config: SandboxConfig) -> Self {
        let docker_available = config.prefer_docker && docker::probe();
        if config.prefer_docker && !docker_available {
            warn!("docker not found on PATH, falling back to native subprocess sandbox");
        }
        Self {
            config,
            docker_available,
        }
    }

    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        if self.docker_available { "docker" } else { "subprocess" }
    }

    /// Run a single test file, enforcing the single-file timeout and memory cap.
    pub async fn run_single(
        &self,
        project_root: &Path,
        test_file: &Path,
        language: &str,
    ) -> Result<RunResult, SandboxError> {
        if !test_file.exists() {
            return Err(SandboxError::MissingTestFile(
                test_file.display().to_string(),
            ));
        }
        let rel = test_file
            .strip_prefix(project_root)
            .unwrap_or(test_file)
            .to_string_lossy()
            .into_owned();
        let profile = profile::for_language(language, Some(&rel));
        self.execute(
            project_root,
            &profile,
            Duration::from_secs(self.config.timeout_single_secs),
            self.config.memory_mb_single,
        )
        .await
    }

    /// Run the full suite, enforcing the full-run timeout and memory cap.
    pub async fn run_full(
        &self,
        project_root: &Path,
        language: &str,
    ) -> Result<RunResult, SandboxError> {
        let profile = profile::for_language(language, None);
        self.execute(
            project_root,
            &profile,
            Duration::from_secs(self.config.timeout_full_secs),
            self.config.memory_mb_full,
        )
        .await
    }

    async fn execute(
        &self,
        project_root: &Path,
        profile: &profile::TestProfile,
        timeout: Duration,
        memory_mb: u64,
    ) -> Result<RunResult, SandboxError> {
        let temp = tempfile::tempdir().map_err(SandboxError::Workspace)?;
        workspace::copy_project(project_root, temp.path()).map_err(SandboxError::Workspace)?;

        let mut steps: Vec<String> = Vec::new();
        for install_step in &profile.install_cmd {
            steps.push(install_step.join(" "));
        }
        steps.push(profile.test_cmd.join(" "));

        debug!(backend = self.backend_name(), "running sandbox command");
        let (exit_code, output) = if self.docker_available {
            docker::run(temp.path(), &steps, memory_mb, timeout).await?
        } else {
            subprocess::run(temp.path(), &steps, timeout).await?
        };

        let counts = parse_test_counts(&output);
        Ok(RunResult {
            ok: exit_code == 0,
            output,
            exit_code,
            total: counts.total,
            passed: counts.passed,
            failed: counts.failed,
        })
    }
}
