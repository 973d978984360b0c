//! Codegen Controller (§4.7): per-node test-then-implementation synthesis with a
//! graph-guided repair loop, run in topological order over the RPG's callable nodes.

use rpg_core::config::CodegenConfig;
use rpg_core::graph::{NodeKind, RepoGraph};
use rpg_llm::LlmGateway;
use rpg_sandbox::{RunResult, SandboxRunner};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What happened to a single node's codegen attempt.
#[derive(Debug, Clone)]
pub enum NodeOutcome {
    Passed { attempts: u32 },
    Failed { attempts: u32, reason: String },
    EnvironmentError { reason: String },
}

#[derive(Debug, Clone)]
pub struct NodeReport {
    pub node_id: String,
    pub outcome: NodeOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct CodegenReport {
    pub success: bool,
    pub generated_files: Vec<String>,
    pub failed_nodes: Vec<String>,
    pub node_reports: Vec<NodeReport>,
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
    pub non_comment_lines: usize,
}

pub struct CodegenController<'a> {
    gateway: &'a LlmGateway,
    sandbox: &'a SandboxRunner,
    config: &'a CodegenConfig,
    project_root: PathBuf,
    language: String,
}

impl<'a> CodegenController<'a> {
    #[must_use]
    pub fn new(
        gateway: &'a LlmGateway,
        sandbox: &'a SandboxRunner,
        config: &'a CodegenConfig,
        project_root: impl Into<PathBuf>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            sandbox,
            config,
            project_root: project_root.into(),
            language: language.into(),
        }
    }

    pub async fn run(&self, graph: &RepoGraph) -> anyhow::Result<CodegenReport> {
        self.materialize_directories(graph)?;

        let order = graph.topological_sort()?;
        let mut report = CodegenReport::default();

        for node_id in &order {
            let Some(node) = graph.node(node_id) else { continue };
            if !node.kind.is_callable() {
                continue;
            }
            let Some(src_path) = node.path_hint.clone() else { continue };
            let test_path = test_path_for(&src_path);

            let outcome = self.synthesize_node(graph, node_id, &src_path, &test_path).await;
            let failed =
                matches!(outcome, NodeOutcome::Failed { .. } | NodeOutcome::EnvironmentError { .. });
            if failed {
                report.failed_nodes.push(node_id.clone());
            } else {
                report.generated_files.push(src_path.clone());
            }
            report.node_reports.push(NodeReport { node_id: node_id.clone(), outcome });
        }

        let full_run = self.sandbox.run_full(&self.project_root, &self.language).await;
        let full_ok = match &full_run {
            Ok(result) => {
                report.total_tests = result.total;
                report.passed_tests = result.passed;
                report.failed_tests = result.failed;
                result.ok
            }
            Err(err) => {
                warn!(error = %err, "full-suite run did not complete");
                false
            }
        };

        report.non_comment_lines = self.count_non_comment_lines(&report.generated_files);
        report.success = report.failed_nodes.is_empty() && full_ok;
        Ok(report)
    }

    fn materialize_directories(&self, graph: &RepoGraph) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.project_root)?;
        std::fs::create_dir_all(self.project_root.join("tests"))?;
        for node in graph.nodes.values() {
            if node.kind == NodeKind::Folder {
                if let Some(hint) = &node.path_hint {
                    std::fs::create_dir_all(self.project_root.join(hint))?;
                }
            }
        }
        Ok(())
    }

    async fn synthesize_node(
        &self,
        graph: &RepoGraph,
        node_id: &str,
        src_path: &str,
        test_path: &str,
    ) -> NodeOutcome {
        let node = graph.node(node_id).expect("node looked up by caller");
        let signature = node.signature.clone().unwrap_or_default();
        let doc = node.doc.clone().unwrap_or_default();

        let test_prompt = format!(
            "Interface signature: {signature}\nDocumentation: {doc}\nWrite a deterministic test \
             for this declaration: no randomness, no network or filesystem access unless \
             explicitly declared. Return only source code.",
        );
        let test_code = self.gateway.generate(&test_prompt, 0.1, 700, None).content;

        let dependencies = graph.transitive_dependencies(node_id, 2);
        let impl_prompt = format!(
            "Interface signature: {signature}\nDocumentation: {doc}\nDeclared dependencies: {:?}\n\
             Implement this declaration fully. Return only source code.",
            dependencies,
        );
        let mut impl_code = self.gateway.generate(&impl_prompt, 0.3, 900, None).content;

        let mut attempts: u32 = 0;
        loop {
            if let Err(err) = self.write_pair(src_path, &impl_code, test_path, &test_code) {
                return NodeOutcome::EnvironmentError { reason: err.to_string() };
            }

            let test_file = self.project_root.join(test_path);
            let run = self.sandbox.run_single(&self.project_root, &test_file, &self.language).await;

            match run {
                Ok(RunResult { ok: true, .. }) => {
                    info!(node_id = %node_id, attempts, "node passed its generated test");
                    return NodeOutcome::Passed { attempts };
                }
                Ok(result) => {
                    attempts += 1;
                    if attempts >= self.config.max_retries as u32 {
                        return NodeOutcome::Failed {
                            attempts,
                            reason: format!("exhausted retries; last output: {}", result.output),
                        };
                    }
                    let repair_prompt = self.repair_prompt(
                        graph,
                        node_id,
                        &signature,
                        &impl_code,
                        &test_code,
                        &result.output,
                    );
                    let repaired = self.gateway.generate(&repair_prompt, 0.3, 900, None);
                    if !repaired.ok {
                        return NodeOutcome::Failed {
                            attempts,
                            reason: format!("repair call failed: {:?}", repaired.err),
                        };
                    }
                    impl_code = repaired.content;
                }
                Err(err) => {
                    // Sandbox/environment errors are excluded from the retry budget: the
                    // sandbox never ran the test, so nothing was learned that a repair could
                    // act on.
                    warn!(node_id = %node_id, error = %err, "sandbox unavailable, not counted against retries");
                    return NodeOutcome::EnvironmentError { reason: err.to_string() };
                }
            }
        }
    }

    fn repair_prompt(
        &self,
        graph: &RepoGraph,
        node_id: &str,
        signature: &str,
        impl_code: &str,
        test_code: &str,
        test_output: &str,
    ) -> String {
        let neighborhood = graph.neighborhood(node_id, 2);
        let neighborhood_docs: Vec<String> = neighborhood
            .iter()
            .map(|n| format!("{}: {}", n.name, n.doc.clone().unwrap_or_default()))
            .collect();
        let dependencies = graph.transitive_dependencies(node_id, 2);

        format!(
            "Signature: {signature}\nCurrent implementation:\n{impl_code}\nTest:\n{test_code}\n\
             Test output:\n{test_output}\nNeighborhood context:\n{}\nTransitive dependencies: {:?}\n\
             Return a fixed implementation only, no commentary.",
            neighborhood_docs.join("\n"),
            dependencies,
        )
    }

    fn write_pair(
        &self,
        src_path: &str,
        impl_code: &str,
        test_path: &str,
        test_code: &str,
    ) -> std::io::Result<()> {
        write_source(&self.project_root.join(src_path), impl_code)?;
        write_source(&self.project_root.join(test_path), test_code)
    }

    fn count_non_comment_lines(&self, files: &[String]) -> usize {
        files
            .iter()
            .filter_map(|path| std::fs::read_to_string(self.project_root.join(path)).ok())
            .map(|content| {
                content
                    .lines()
                    .filter(|line| {
                        let trimmed = line.trim();
                        !trimmed.is_empty() && !trimmed.starts_with('#') && !trimmed.starts_with("//")
                    })
                    .count()
            })
            .sum()
    }
}

fn write_source(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)
}

/// `src/a/b/x.<ext>` -> `tests/a/b/test_x.<ext>`, per the directory materialization convention.
fn test_path_for(src_path: &str) -> String {
    let path = Path::new(src_path);
    let file_name = path.file_name().and_then(|f| f.to_str()).unwrap_or("module");
    let (stem, ext) = file_name.rsplit_once('.').unwrap_or((file_name, ""));
    let test_name = if ext.is_empty() {
        format!("test_{stem}")
    } else {
        format!("test_{stem}.{ext}")
    };

    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let rel_dir: PathBuf = parent.components().filter(|c| c.as_os_str() != "src").collect();

    PathBuf::from("tests").join(rel_dir).join(test_name).to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_for_mirrors_src_tree_under_tests() {
        assert_eq!(test_path_for("src/a/b/x.py"), "tests/a/b/test_x.py");
        assert_eq!(test_path_for("src/core/module_0.rs"), "tests/core/test_module_0.rs");
    }
}
