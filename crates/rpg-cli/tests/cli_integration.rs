//! Integration tests for rpg-cli functionality.
//! Tests the underlying library functions that the CLI commands invoke.

use rpg_core::config::PipelineConfig;
use rpg_core::graph::{Node, RepoGraph};
use rpg_core::job::{InProcessJobStore, JobStatus};
use rpg_orchestrator::{CancellationToken, NoopSink, Orchestrator};

fn deterministic_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.llm.provider = "deterministic".to_string();
    config.embedding.provider = "deterministic".to_string();
    config.sandbox.prefer_docker = false;
    config.proposal.max_iterations = 1;
    config
}

#[test]
fn test_storage_load_nonexistent() {
    let tmpdir = tempfile::tempdir().unwrap();
    let result = rpg_core::storage::load(tmpdir.path());
    assert!(result.is_err(), "loading from empty dir should fail");
}

#[test]
fn test_storage_roundtrip() {
    let tmpdir = tempfile::tempdir().unwrap();
    let mut graph = RepoGraph::new();
    graph.add_node(Node::capability("cap:core", "core", "core"));
    graph.metadata.goal = Some("build a calculator".to_string());

    rpg_core::storage::save(tmpdir.path(), &graph).unwrap();
    assert!(rpg_core::storage::rpg_exists(tmpdir.path()));

    let loaded = rpg_core::storage::load(tmpdir.path()).unwrap();
    assert_eq!(loaded.nodes.len(), 1);
    assert!(loaded.node("cap:core").is_some());
    assert_eq!(loaded.metadata.goal.as_deref(), Some("build a calculator"));
}

#[test]
fn test_rpg_exists_false() {
    let tmpdir = tempfile::tempdir().unwrap();
    assert!(!rpg_core::storage::rpg_exists(tmpdir.path()));
}

#[test]
fn test_config_defaults_without_file() {
    std::env::remove_var("RPG_CONFIG");
    let tmpdir = tempfile::tempdir().unwrap();
    std::env::set_var("LLM_API_KEY", "test-key-for-defaults");
    let config = PipelineConfig::load(tmpdir.path()).unwrap();
    std::env::remove_var("LLM_API_KEY");
    assert_eq!(config.codegen.max_retries, 8);
    assert_eq!(config.proposal.max_iterations, 5);
    assert_eq!(config.embedding.dimension, 384);
}

#[tokio::test]
async fn plan_then_build_reaches_a_terminal_status_without_rerunning_proposal() {
    let tmpdir = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::new(
        deterministic_config(),
        tmpdir.path(),
        Box::new(InProcessJobStore::new()),
        Box::new(NoopSink),
    )
    .unwrap();

    let graph = orchestrator.plan("build a calculator").await;
    assert!(!graph.nodes.is_empty());

    rpg_core::storage::save(tmpdir.path(), &graph).unwrap();
    let reloaded = rpg_core::storage::load(tmpdir.path()).unwrap();

    let cancel = CancellationToken::new();
    let job = orchestrator.build("build-1", reloaded, "python", &cancel).await;
    assert!(matches!(job.status, JobStatus::Completed | JobStatus::Failed));
}
