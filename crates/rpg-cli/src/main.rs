//! CLI binary for the repository-planning pipeline: plan a capability graph, build it into
//! source, or run the whole thing end to end.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rpg_core::config::PipelineConfig;
use rpg_core::job::{FileJobStore, InProcessJobStore, Job, JobStatus, JobStore};
use rpg_llm::progress::PipelineProgress;
use rpg_orchestrator::{CancellationToken, Orchestrator, ProgressSink};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "rpg-encoder", about = "Repository Planning Graph pipeline")]
struct Cli {
    /// Project root directory (defaults to current directory)
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run Stage A only and print the resulting capability graph
    Plan {
        /// Natural-language description of the repository to synthesize
        #[arg(long)]
        goal: String,

        /// Restrict proposal to a domain ontology file
        #[arg(long)]
        domain: Option<PathBuf>,

        /// Override the configured proposal iteration cap
        #[arg(long)]
        max_iterations: Option<usize>,
    },

    /// Run Stages B+C against a previously saved capability graph
    Build {
        /// Project root holding a `.rpg/graph.json` saved by `plan`
        #[arg(long = "rpg")]
        rpg: PathBuf,

        /// Target language for generated source
        #[arg(long, default_value = "python")]
        language: String,
    },

    /// Run the full pipeline end to end and persist the resulting graph
    Generate {
        /// Natural-language description of the repository to synthesize
        #[arg(long)]
        goal: String,

        /// Target language for generated source
        #[arg(long, default_value = "python")]
        language: String,

        /// Restrict proposal to a domain ontology file
        #[arg(long)]
        domain: Option<PathBuf>,

        /// Override the configured proposal iteration cap
        #[arg(long)]
        max_iterations: Option<usize>,
    },

    /// Run the pipeline against a fixture suite and report pass/fail counts
    Eval {
        /// Path to a JSON array of `{ "goal": ..., "language": ... }` cases
        #[arg(long)]
        benchmark: PathBuf,
    },

    /// Scaffold an empty project directory without invoking the LLM
    Init {
        /// Project name, also used as the directory name
        name: String,

        /// Template to seed the scaffold with (currently only "default")
        #[arg(long, default_value = "default")]
        template: String,
    },
}

#[derive(serde::Deserialize)]
struct BenchmarkCase {
    goal: String,
    #[serde(default = "default_language")]
    language: String,
}

fn default_language() -> String {
    "python".to_string()
}

fn get_project_root(cli: &Cli) -> Result<PathBuf> {
    match &cli.project {
        Some(p) => Ok(p.clone()),
        None => std::env::current_dir().context("failed to get current directory"),
    }
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<rpg_core::error::ConfigError>().is_some()
        || matches!(
            err.downcast_ref::<rpg_orchestrator::OrchestratorError>(),
            Some(rpg_orchestrator::OrchestratorError::Configuration(_))
        )
    {
        2
    } else if err.downcast_ref::<rpg_core::error::GraphError>().is_some() {
        3
    } else {
        1
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let project_root = match get_project_root(&cli) {
        Ok(p) => p,
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Plan {
            goal,
            domain,
            max_iterations,
        } => cmd_plan(&project_root, &goal, domain.as_deref(), max_iterations).await,
        Commands::Build { rpg, language } => cmd_build(&rpg, &language).await,
        Commands::Generate {
            goal,
            language,
            domain,
            max_iterations,
        } => cmd_generate(&project_root, &goal, &language, domain.as_deref(), max_iterations).await,
        Commands::Eval { benchmark } => cmd_eval(&project_root, &benchmark).await,
        Commands::Init { name, template } => cmd_init(&name, &template),
    };

    if let Err(err) = result {
        eprintln!("error: {err:#}");
        std::process::exit(exit_code_for(&err));
    }
}

fn load_config(
    project_root: &Path,
    domain: Option<&Path>,
    max_iterations: Option<usize>,
) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::load(project_root)?;
    if let Some(domain) = domain {
        config.proposal.domain_filter = Some(domain.display().to_string());
    }
    if let Some(max_iterations) = max_iterations {
        config.proposal.max_iterations = max_iterations;
    }
    Ok(config)
}

fn job_store_for(config: &PipelineConfig) -> Result<Box<dyn JobStore>> {
    if config.storage.backend == "file" {
        Ok(Box::new(FileJobStore::new(config.storage.directory.clone())?))
    } else {
        Ok(Box::new(InProcessJobStore::new()))
    }
}

async fn cmd_plan(
    project_root: &Path,
    goal: &str,
    domain: Option<&Path>,
    max_iterations: Option<usize>,
) -> Result<()> {
    let config = load_config(project_root, domain, max_iterations)?;
    let job_store = job_store_for(&config)?;
    let orchestrator = Orchestrator::new(config, project_root, job_store, Box::new(rpg_orchestrator::NoopSink))?;

    let mut graph = orchestrator.plan(goal).await;
    graph.metadata.goal = Some(goal.to_string());
    rpg_core::storage::save(project_root, &graph)?;

    println!("{}", rpg_core::schema::to_json(&graph)?);
    eprintln!(
        "proposal stage produced {} nodes, {} edges; saved to {}",
        graph.nodes.len(),
        graph.edges.len(),
        rpg_core::storage::rpg_file(project_root).display()
    );
    Ok(())
}

async fn cmd_build(rpg_project_root: &Path, language: &str) -> Result<()> {
    let graph = rpg_core::storage::load(rpg_project_root)?;
    let config = load_config(rpg_project_root, None, None)?;
    let job_store = job_store_for(&config)?;
    let orchestrator = Orchestrator::new(
        config,
        rpg_project_root,
        job_store,
        Box::new(CliProgressSink::new()),
    )?;

    let cancel = CancellationToken::new();
    let job = orchestrator.build("build", graph, language, &cancel).await;
    report_job(&job)
}

async fn cmd_generate(
    project_root: &Path,
    goal: &str,
    language: &str,
    domain: Option<&Path>,
    max_iterations: Option<usize>,
) -> Result<()> {
    let config = load_config(project_root, domain, max_iterations)?;
    let job_store = job_store_for(&config)?;
    let orchestrator = Orchestrator::new(
        config,
        project_root,
        job_store,
        Box::new(CliProgressSink::new()),
    )?;

    let cancel = CancellationToken::new();
    let job = orchestrator.run("generate", goal, language, &cancel).await;
    report_job(&job)
}

fn report_job(job: &Job) -> Result<()> {
    match &job.result {
        Some(result) => {
            for path in &result.generated_files {
                println!("{path}");
            }
            eprintln!(
                "{} generated, {} failed, {}/{} tests passed",
                result.generated_files.len(),
                result.failed_files.len(),
                result.test_results.passed,
                result.test_results.total
            );
        }
        None => eprintln!("job produced no result"),
    }

    if job.status == JobStatus::Failed {
        anyhow::bail!(job.error.clone().unwrap_or_else(|| "job failed".to_string()));
    }
    Ok(())
}

async fn cmd_eval(project_root: &Path, benchmark: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(benchmark)
        .with_context(|| format!("failed to read benchmark suite {}", benchmark.display()))?;
    let cases: Vec<BenchmarkCase> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse benchmark suite {}", benchmark.display()))?;

    let config = load_config(project_root, None, None)?;
    let mut passed = 0usize;
    let mut failed = 0usize;

    for (index, case) in cases.iter().enumerate() {
        let job_store = job_store_for(&config)?;
        let orchestrator = Orchestrator::new(
            config.clone(),
            project_root,
            job_store,
            Box::new(rpg_orchestrator::NoopSink),
        )?;
        let cancel = CancellationToken::new();
        let job_id = format!("eval-{index}");
        let job = orchestrator.run(&job_id, &case.goal, &case.language, &cancel).await;

        let case_passed = job.status == JobStatus::Completed
            && job.result.as_ref().is_some_and(|r| r.failed_files.is_empty());
        if case_passed {
            passed += 1;
            println!("PASS [{index}] {}", case.goal);
        } else {
            failed += 1;
            println!("FAIL [{index}] {}", case.goal);
        }
    }

    eprintln!("{passed} passed, {failed} failed, {} total", cases.len());
    if failed > 0 {
        anyhow::bail!("{failed} of {} benchmark cases failed", cases.len());
    }
    Ok(())
}

fn cmd_init(name: &str, template: &str) -> Result<()> {
    if template != "default" {
        anyhow::bail!("unknown template '{template}'");
    }

    let root = PathBuf::from(name);
    if root.exists() {
        anyhow::bail!("directory '{name}' already exists");
    }

    std::fs::create_dir_all(root.join(".rpg")).context("failed to create .rpg directory")?;
    std::fs::create_dir_all(root.join("src")).context("failed to create src directory")?;
    std::fs::create_dir_all(root.join("tests")).context("failed to create tests directory")?;

    let config = PipelineConfig::default();
    let toml = toml::to_string_pretty(&config).context("failed to serialize default configuration")?;
    std::fs::write(root.join(".rpg").join("config.toml"), toml).context("failed to write default config")?;

    println!("{}", root.display());
    eprintln!("scaffolded project '{name}' from template '{template}'");
    Ok(())
}

/// Renders stage and codegen-node transitions as terminal progress bars, the CLI counterpart
/// to the HTTP facade's `TracingSink`.
struct CliProgressSink {
    progress: PipelineProgress,
}

impl CliProgressSink {
    fn new() -> Self {
        Self {
            progress: PipelineProgress::new(),
        }
    }
}

impl ProgressSink for CliProgressSink {
    fn on_stage_start(&self, stage: rpg_core::job::Stage, progress: u8) {
        self.progress.start_phase(&format!("{stage:?}"), 100);
        self.progress.tick_phase_by(u64::from(progress));
    }

    fn on_codegen_node(&self, completed: usize, total: usize) {
        self.progress.set_phase_message(&format!("{completed}/{total} files"));
        self.progress.tick_phase();
    }
}

impl Drop for CliProgressSink {
    fn drop(&mut self) {
        self.progress.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_scaffolds_the_expected_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let project_dir = tmp.path().join("demo");
        std::env::set_current_dir(tmp.path()).unwrap();

        cmd_init("demo", "default").unwrap();

        assert!(project_dir.join(".rpg").join("config.toml").exists());
        assert!(project_dir.join("src").is_dir());
        assert!(project_dir.join("tests").is_dir());
    }

    #[test]
    fn init_rejects_unknown_template() {
        let tmp = tempfile::tempdir().unwrap();
        std::env::set_current_dir(tmp.path()).unwrap();
        assert!(cmd_init("demo2", "exotic").is_err());
    }

    #[test]
    fn init_refuses_to_overwrite_an_existing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        std::env::set_current_dir(tmp.path()).unwrap();
        cmd_init("demo3", "default").unwrap();
        assert!(cmd_init("demo3", "default").is_err());
    }
}
