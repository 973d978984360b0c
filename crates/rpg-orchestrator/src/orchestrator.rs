//! Sequences the Proposal, Implementation, and Codegen controllers behind one `Job` (§4.8).

use crate::cancellation::CancellationToken;
use crate::error::OrchestratorError;
use crate::progress::ProgressSink;
use rpg_build::{ImplementationController, ProposalController};
use rpg_core::config::PipelineConfig;
use rpg_core::graph::RepoGraph;
use rpg_core::job::{Job, JobResult, JobStore, Metrics, Stage, TestSummary};
use rpg_embed::EmbeddingStore;
use rpg_gen::CodegenController;
use rpg_llm::LlmGateway;
use rpg_sandbox::SandboxRunner;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{info, instrument};

/// Owns the dependencies every controller needs and drives one job to completion.
pub struct Orchestrator {
    config: PipelineConfig,
    gateway: LlmGateway,
    store: Mutex<EmbeddingStore>,
    sandbox: SandboxRunner,
    job_store: Box<dyn JobStore>,
    progress: Box<dyn ProgressSink>,
    project_root: PathBuf,
}

impl Orchestrator {
    /// Construct every dependency from configuration. A construction failure is a
    /// Configuration error and is fatal before any job is created.
    pub fn new(
        config: PipelineConfig,
        project_root: impl Into<PathBuf>,
        job_store: Box<dyn JobStore>,
        progress: Box<dyn ProgressSink>,
    ) -> Result<Self, OrchestratorError> {
        let api_key = std::env::var(&config.llm.api_key_env).unwrap_or_default();
        if config.llm.provider != "deterministic" && api_key.is_empty() {
            return Err(OrchestratorError::Configuration(format!(
                "missing API key in environment variable '{}'",
                config.llm.api_key_env
            )));
        }
        let llm_provider = rpg_llm::create_provider(&config.llm.provider, &api_key, Some(&config.llm.model), None)
            .map_err(|err| OrchestratorError::Configuration(err.to_string()))?;
        let gateway = LlmGateway::new(llm_provider);

        let embedding_provider = rpg_embed::provider::from_config(&config.embedding)
            .map_err(|err| OrchestratorError::Configuration(err.to_string()))?;
        let store = EmbeddingStore::new(embedding_provider);

        let sandbox = SandboxRunner::new(config.sandbox.clone());

        Ok(Self {
            config,
            gateway,
            store: Mutex::new(store),
            sandbox,
            job_store,
            progress,
            project_root: project_root.into(),
        })
    }

    /// Drive a job from `Queued` through `Codegen` to a terminal status, honoring `cancel` at
    /// every controller boundary. Returns the final `Job` row (also persisted via `job_store`).
    #[instrument(skip(self, cancel), fields(job_id = %job_id))]
    pub async fn run(
        &self,
        job_id: &str,
        goal: &str,
        language: &str,
        cancel: &CancellationToken,
    ) -> Job {
        let mut job = Job::new(job_id, goal.to_string());
        self.job_store.insert_one(job.clone());

        match self.run_stages(&mut job, goal, language, cancel).await {
            Ok(result) => job.complete(result),
            Err(OrchestratorError::Cancelled) => job.fail("cancelled"),
            Err(err) => job.fail(err.to_string()),
        }
        self.job_store.update_one(job.clone());
        job
    }

    /// Drive a job through `Implementation` and `Codegen` only, starting from a capability graph
    /// produced by an earlier Proposal run (`plan`) rather than running Proposal again. Backs the
    /// CLI's `build --rpg <path>` subcommand (§4.12).
    #[instrument(skip(self, graph, cancel), fields(job_id = %job_id))]
    pub async fn build(&self, job_id: &str, graph: RepoGraph, language: &str, cancel: &CancellationToken) -> Job {
        let mut job = Job::new(job_id, graph.metadata.goal.clone().unwrap_or_default());
        self.job_store.insert_one(job.clone());

        let mut graph = graph;
        match self.implementation_and_codegen_stages(&mut job, &mut graph, language, cancel).await {
            Ok(result) => job.complete(result),
            Err(OrchestratorError::Cancelled) => job.fail("cancelled"),
            Err(err) => job.fail(err.to_string()),
        }
        self.job_store.update_one(job.clone());
        job
    }

    async fn run_stages(
        &self,
        job: &mut Job,
        goal: &str,
        language: &str,
        cancel: &CancellationToken,
    ) -> Result<JobResult, OrchestratorError> {
        job.start_stage(Stage::Proposal, 10);
        self.progress.on_stage_start(Stage::Proposal, 10);
        self.job_store.update_one(job.clone());
        self.check_cancelled(cancel)?;

        let store_guard = self.store.lock().expect("lock poisoned");
        let proposal = ProposalController::new(&store_guard, &self.gateway, &self.config.proposal);
        let (mut graph, _selected, _rejected) = proposal.run(goal).await;
        drop(proposal);
        drop(store_guard);
        info!(nodes = graph.nodes.len(), "proposal stage produced capability graph");
        if graph.nodes.is_empty() {
            return Err(OrchestratorError::Other(anyhow::anyhow!("no features accepted")));
        }
        self.check_cancelled(cancel)?;

        self.implementation_and_codegen_stages(job, &mut graph, language, cancel).await
    }

    async fn implementation_and_codegen_stages(
        &self,
        job: &mut Job,
        graph: &mut RepoGraph,
        language: &str,
        cancel: &CancellationToken,
    ) -> Result<JobResult, OrchestratorError> {
        job.start_stage(Stage::Implementation, 40);
        self.progress.on_stage_start(Stage::Implementation, 40);
        self.job_store.update_one(job.clone());
        self.check_cancelled(cancel)?;

        let implementation = ImplementationController::new(&self.gateway);
        let _interfaces = implementation.run(graph);
        self.check_cancelled(cancel)?;

        job.start_stage(Stage::Codegen, 70);
        self.progress.on_stage_start(Stage::Codegen, 70);
        self.job_store.update_one(job.clone());

        let codegen = CodegenController::new(
            &self.gateway,
            &self.sandbox,
            &self.config.codegen,
            self.project_root.join(&job.id),
            language,
        );
        let report = codegen.run(graph).await.map_err(OrchestratorError::Other)?;
        self.check_cancelled(cancel)?;

        Ok(JobResult {
            generated_files: report.generated_files,
            failed_files: report.failed_nodes,
            test_results: TestSummary {
                total: report.total_tests,
                passed: report.passed_tests,
                failed: report.failed_tests,
            },
            metrics: Metrics {
                success_rate: if report.total_tests == 0 {
                    0.0
                } else {
                    report.passed_tests as f64 / report.total_tests as f64
                },
                generated_lines: report.non_comment_lines,
            },
        })
    }

    fn check_cancelled(&self, cancel: &CancellationToken) -> Result<(), OrchestratorError> {
        if cancel.is_cancelled() {
            Err(OrchestratorError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Run only the Proposal stage and return its capability graph, without creating a `Job`.
    /// Backs the synchronous `/api/zerorepo/plan` route (§4.11), which never touches the job store.
    #[instrument(skip(self))]
    pub async fn plan(&self, goal: &str) -> RepoGraph {
        let store_guard = self.store.lock().expect("lock poisoned");
        let proposal = ProposalController::new(&store_guard, &self.gateway, &self.config.proposal);
        let (graph, _selected, _rejected) = proposal.run(goal).await;
        drop(proposal);
        drop(store_guard);
        graph
    }

    /// The job store backing this orchestrator, for the HTTP façade's read-only job routes.
    pub fn job_store(&self) -> &dyn JobStore {
        self.job_store.as_ref()
    }

    /// The configured LLM model name, for `/api/models`.
    pub fn model_name(&self) -> &str {
        self.gateway.model_name()
    }

    /// The configured LLM provider name, for `/api/models`.
    pub fn provider_name(&self) -> &str {
        &self.config.llm.provider
    }

    /// Number of feature paths currently indexed in the embedding store, for `/api/health`.
    pub fn embedding_count(&self) -> usize {
        self.store.lock().expect("lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpg_core::config::PipelineConfig;
    use rpg_core::job::InProcessJobStore;
    use rpg_core::job::JobStatus;
    use crate::progress::NoopSink;

    fn deterministic_config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.llm.provider = "deterministic".to_string();
        config.embedding.provider = "deterministic".to_string();
        config.sandbox.prefer_docker = false;
        config.proposal.max_iterations = 1;
        config
    }

    #[tokio::test]
    async fn construction_fails_without_api_key_for_hosted_provider() {
        let mut config = PipelineConfig::default();
        config.llm.provider = "anthropic".to_string();
        config.llm.api_key_env = "RPG_TEST_MISSING_KEY_VAR".to_string();
        let tmp = tempfile::tempdir().unwrap();
        let result = Orchestrator::new(
            config,
            tmp.path(),
            Box::new(InProcessJobStore::new()),
            Box::new(NoopSink),
        );
        assert!(matches!(result, Err(OrchestratorError::Configuration(_))));
    }

    #[tokio::test]
    async fn run_reaches_a_terminal_status_with_deterministic_providers() {
        let tmp = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(
            deterministic_config(),
            tmp.path(),
            Box::new(InProcessJobStore::new()),
            Box::new(NoopSink),
        )
        .unwrap();

        let cancel = CancellationToken::new();
        let job = orchestrator.run("job-1", "build a calculator", "python", &cancel).await;
        assert!(matches!(job.status, JobStatus::Completed | JobStatus::Failed));
    }

    #[tokio::test]
    async fn empty_proposal_graph_fails_the_job_with_no_features_accepted() {
        let tmp = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(
            deterministic_config(),
            tmp.path(),
            Box::new(InProcessJobStore::new()),
            Box::new(NoopSink),
        )
        .unwrap();

        let cancel = CancellationToken::new();
        let job = orchestrator.run("job-1", "build a calculator", "python", &cancel).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("no features accepted"));
    }

    #[tokio::test]
    async fn cancellation_before_start_short_circuits_the_run() {
        let tmp = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(
            deterministic_config(),
            tmp.path(),
            Box::new(InProcessJobStore::new()),
            Box::new(NoopSink),
        )
        .unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let job = orchestrator.run("job-1", "build a calculator", "python", &cancel).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("cancelled"));
    }
}
