//! Layered configuration (§4.9).
//!
//! Load order: defaults → `.rpg/config.toml` (or `$RPG_CONFIG`) → environment variables.
//! Validated once, at orchestrator construction; a failure here is a Configuration error
//! and is fatal before any job is created (§7).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub sandbox: SandboxConfig,
    pub proposal: ProposalConfig,
    pub codegen: CodegenConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "anthropic", "openai", or "deterministic" (test double).
    pub provider: String,
    pub model: String,
    /// Name of the environment variable holding the API key (not the key itself).
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet".to_string(),
            api_key_env: "LLM_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider name: "local", "remote", or "deterministic" (test double).
    pub provider: String,
    pub model: String,
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "local".to_string(),
            model: "all-MiniLM-L6-v2".to_string(),
            dimension: 384,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub timeout_single_secs: u64,
    pub timeout_full_secs: u64,
    pub memory_mb_single: u64,
    pub memory_mb_full: u64,
    /// Prefer the docker backend when available; falls back to subprocess otherwise.
    pub prefer_docker: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout_single_secs: 30,
            timeout_full_secs: 120,
            memory_mb_single: 512,
            memory_mb_full: 1024,
            prefer_docker: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposalConfig {
    pub max_iterations: usize,
    pub domain_filter: Option<String>,
}

impl Default for ProposalConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            domain_filter: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenConfig {
    pub max_retries: usize,
    pub worker_pool_size: usize,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            max_retries: 8,
            worker_pool_size: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// "in_process" or "file".
    pub backend: String,
    pub directory: PathBuf,
    /// Compress graph.json with zstd before writing.
    pub compress: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "in_process".to_string(),
            directory: PathBuf::from(".rpg/jobs"),
            compress: false,
        }
    }
}

fn env_override<T: std::str::FromStr>(var: &str, target: &mut T) {
    if let Ok(v) = std::env::var(var)
        && let Ok(n) = v.parse()
    {
        *target = n;
    }
}

fn env_override_opt(var: &str, target: &mut Option<String>) {
    if let Ok(v) = std::env::var(var) {
        *target = Some(v);
    }
}

impl PipelineConfig {
    /// Load config from `$RPG_CONFIG`, or `<project_root>/.rpg/config.toml`, with
    /// environment variable overrides. Falls back to defaults if no file exists.
    pub fn load(project_root: &Path) -> Result<Self, ConfigError> {
        let config_path = std::env::var("RPG_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| project_root.join(".rpg").join("config.toml"));

        let mut config = if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
                    path: config_path.display().to_string(),
                    source,
                })?;
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: config_path.display().to_string(),
                source,
            })?
        } else {
            Self::default()
        };

        env_override("RPG_LLM_PROVIDER", &mut config.llm.provider);
        env_override("RPG_LLM_MODEL", &mut config.llm.model);
        env_override("RPG_LLM_TIMEOUT_SECS", &mut config.llm.timeout_secs);
        env_override("RPG_EMBEDDING_PROVIDER", &mut config.embedding.provider);
        env_override(
            "RPG_SANDBOX_TIMEOUT_SINGLE_SECS",
            &mut config.sandbox.timeout_single_secs,
        );
        env_override(
            "RPG_SANDBOX_TIMEOUT_FULL_SECS",
            &mut config.sandbox.timeout_full_secs,
        );
        env_override(
            "RPG_PROPOSAL_MAX_ITERATIONS",
            &mut config.proposal.max_iterations,
        );
        env_override_opt("DOMAIN_ONTOLOGY_PATH", &mut config.proposal.domain_filter);
        env_override("RPG_CODEGEN_MAX_RETRIES", &mut config.codegen.max_retries);

        if let Ok(url) = std::env::var("DATASTORE_URL") {
            config.storage.backend = "file".to_string();
            config.storage.directory = PathBuf::from(url);
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sandbox.timeout_full_secs < self.sandbox.timeout_single_secs {
            return Err(ConfigError::Invalid(format!(
                "sandbox.timeout_full_secs ({}) must be >= sandbox.timeout_single_secs ({})",
                self.sandbox.timeout_full_secs, self.sandbox.timeout_single_secs
            )));
        }
        if self.sandbox.memory_mb_full < self.sandbox.memory_mb_single {
            return Err(ConfigError::Invalid(format!(
                "sandbox.memory_mb_full ({}) must be >= sandbox.memory_mb_single ({})",
                self.sandbox.memory_mb_full, self.sandbox.memory_mb_single
            )));
        }
        if self.proposal.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "proposal.max_iterations must be at least 1".to_string(),
            ));
        }
        if self.llm.provider != "deterministic" && std::env::var(&self.llm.api_key_env).is_err() {
            return Err(ConfigError::Invalid(format!(
                "missing required environment variable `{}`",
                self.llm.api_key_env
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = PipelineConfig::default();
        assert_eq!(config.codegen.max_retries, 8);
        assert_eq!(config.sandbox.timeout_single_secs, 30);
        assert_eq!(config.sandbox.timeout_full_secs, 120);
        assert_eq!(config.sandbox.memory_mb_single, 512);
        assert_eq!(config.sandbox.memory_mb_full, 1024);
    }

    #[test]
    fn load_nonexistent_path_uses_defaults() {
        std::env::remove_var("RPG_CONFIG");
        let config = PipelineConfig::load(Path::new("/nonexistent/path")).unwrap();
        assert_eq!(config.codegen.max_retries, 8);
    }

    #[test]
    fn rejects_inverted_sandbox_timeouts() {
        let mut config = PipelineConfig::default();
        config.llm.provider = "deterministic".to_string();
        config.sandbox.timeout_full_secs = 5;
        config.sandbox.timeout_single_secs = 30;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn deterministic_provider_does_not_require_api_key() {
        std::env::remove_var("LLM_API_KEY");
        let mut config = PipelineConfig::default();
        config.llm.provider = "deterministic".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn toml_overrides_apply_per_section() {
        let toml_str = r#"
[llm]
provider = "deterministic"
model = "test-model"

[codegen]
max_retries = 3
"#;
        let config: PipelineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.llm.model, "test-model");
        assert_eq!(config.codegen.max_retries, 3);
        // Unspecified sections keep their defaults.
        assert_eq!(config.sandbox.timeout_single_secs, 30);
    }
}
