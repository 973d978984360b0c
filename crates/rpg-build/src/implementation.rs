//! Implementation Controller (§4.6): B1 file-structure assignment and B2 interface synthesis.

use rpg_core::graph::{Edge, EdgeKind, Node, NodeKind, NodeMeta, RepoGraph};
use rpg_llm::LlmGateway;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

const FALLBACK_FOLDERS: &[&str] = &["src/core", "src/algorithms", "src/utils", "tests"];

/// Method-name pairs recognized as a recurring pattern worth abstracting into a base class,
/// checked against the leaf segment of each capability's feature path.
const RECURRING_PATTERN_PAIRS: &[(&str, &str)] = &[
    ("fit", "predict"),
    ("transform", "process"),
    ("encode", "decode"),
    ("build", "render"),
    ("read", "write"),
];

#[derive(Debug, Deserialize)]
struct FolderPlan {
    #[serde(default)]
    folders: Vec<FolderEntry>,
}

#[derive(Debug, Deserialize)]
struct FolderEntry {
    name: String,
    #[serde(default)]
    maps: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BaseClassPlan {
    #[serde(default)]
    bases: Vec<BaseClassEntry>,
}

#[derive(Debug, Deserialize)]
struct BaseClassEntry {
    name: String,
    #[serde(default)]
    doc: String,
    #[serde(default)]
    signature: String,
}

/// Drives B1 (folder/file skeleton) and B2 (interfaces, data flow, declaration nodes) over a
/// capability graph produced by the Proposal Controller, returning the same graph extended
/// with folder/file/class/function nodes and a map of generated interface sources.
pub struct ImplementationController<'a> {
    gateway: &'a LlmGateway,
}

impl<'a> ImplementationController<'a> {
    #[must_use]
    pub fn new(gateway: &'a LlmGateway) -> Self {
        Self { gateway }
    }

    pub fn run(&self, graph: &mut RepoGraph) -> HashMap<String, String> {
        let root_capabilities = self.root_capability_names(graph);
        let folder_ids = self.b1_folder_skeleton(graph, &root_capabilities);
        let file_assignments = self.b1_file_assignment(graph);
        let file_ids = self.materialize_files(graph, &folder_ids, &file_assignments);

        self.b2_base_classes(graph, &folder_ids, &file_ids);

        let interfaces = self.b2_per_file_interfaces(graph, &file_ids);
        self.b2_materialize_declarations(graph, &file_ids, &interfaces);
        interfaces
    }

    fn root_capability_names(&self, graph: &RepoGraph) -> Vec<String> {
        let mut parents: std::collections::HashSet<&str> = std::collections::HashSet::new();
        for node in graph.nodes.values() {
            for child in &node.children {
                parents.insert(child.as_str());
            }
        }
        let mut names: Vec<String> = graph
            .nodes
            .values()
            .filter(|n| n.kind == NodeKind::Capability && !parents.contains(n.id.as_str()))
            .map(|n| n.name.clone())
            .collect();
        names.sort();
        names
    }

    fn b1_folder_skeleton(&self, graph: &mut RepoGraph, roots: &[String]) -> Vec<String> {
        let prompt = format!(
            "Root capabilities: {:?}\nPropose a folder skeleton under src/ plus auxiliary \
             folders as JSON: {{\"folders\": [{{\"name\": str, \"maps\": [capability names]}}]}}",
            roots,
        );

        let folders = match self.gateway.generate_json(&prompt, 0.2, 400, None) {
            Ok((value, _)) => serde_json::from_value::<FolderPlan>(value)
                .map(|plan| plan.folders)
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        };

        let folders = if folders.is_empty() {
            debug!("folder skeleton fell back to deterministic layout");
            FALLBACK_FOLDERS
                .iter()
                .map(|name| FolderEntry { name: (*name).to_string(), maps: Vec::new() })
                .collect()
        } else {
            folders
        };

        let mut folder_ids = Vec::new();
        for entry in folders {
            let id = format!("folder::{}", entry.name);
            graph.add_node(Node {
                id: id.clone(),
                kind: NodeKind::Folder,
                name: entry.name.clone(),
                path_hint: Some(entry.name.clone()),
                signature: None,
                doc: None,
                children: Vec::new(),
                meta: NodeMeta::default(),
            });

            for capability in graph
                .nodes
                .values()
                .filter(|n| {
                    n.kind == NodeKind::Capability
                        && entry.maps.iter().any(|m| m.eq_ignore_ascii_case(&n.name))
                })
                .map(|n| n.id.clone())
                .collect::<Vec<_>>()
            {
                graph.add_edge(Edge::new(capability, id.clone(), EdgeKind::DependsOn));
            }

            folder_ids.push(id);
        }
        folder_ids
    }

    fn b1_file_assignment(&self, graph: &RepoGraph) -> BTreeMap<String, Vec<String>> {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for node in graph.nodes.values() {
            let Some(fp) = &node.meta.feature_path else { continue };
            if !graph.children(&node.id).is_empty() {
                continue;
            }
            let segments: Vec<&str> = fp.split('/').take(2).collect();
            grouped.entry(segments.join("/")).or_default().push(fp.clone());
        }

        let prompt = format!(
            "Leaf capability groups: {:?}\nAssign each group to a file under a designated \
             folder. Respond as a JSON object mapping file_path to an array of feature paths.",
            grouped,
        );

        match self.gateway.generate_json(&prompt, 0.2, 500, None) {
            Ok((value, _)) => parse_file_assignment(&value),
            Err(_) => fallback_file_assignment(&grouped),
        }
    }

    fn materialize_files(
        &self,
        graph: &mut RepoGraph,
        folder_ids: &[String],
        assignments: &BTreeMap<String, Vec<String>>,
    ) -> Vec<String> {
        let mut file_ids = Vec::new();
        for (file_path, features) in assignments {
            let id = format!("file::{file_path}");
            graph.add_node(Node {
                id: id.clone(),
                kind: NodeKind::File,
                name: file_path.clone(),
                path_hint: Some(file_path.clone()),
                signature: None,
                doc: None,
                children: Vec::new(),
                meta: NodeMeta { features: features.clone(), ..Default::default() },
            });

            if let Some(folder) = containing_folder(file_path, folder_ids) {
                if let Some(folder_node) = graph.node_mut(&folder) {
                    folder_node.children.push(id.clone());
                }
            }

            for capability in graph
                .nodes
                .values()
                .filter(|n| {
                    n.meta.feature_path.as_ref().is_some_and(|fp| features.contains(fp))
                })
                .map(|n| n.id.clone())
                .collect::<Vec<_>>()
            {
                graph.add_edge(Edge::new(capability, id.clone(), EdgeKind::DependsOn));
            }

            file_ids.push(id);
        }
        file_ids
    }

    /// Looks for method-name patterns (e.g. `fit`/`predict`) shared across at least two
    /// assigned files; if two or more such patterns recur, asks the LLM for minimal abstract
    /// base class definitions and materializes them as class nodes. Skips entirely when fewer
    /// than two patterns are found, since a single recurring pair doesn't justify an
    /// abstraction.
    fn b2_base_classes(&self, graph: &mut RepoGraph, folder_ids: &[String], file_ids: &[String]) {
        let patterns = self.detect_recurring_patterns(graph, file_ids);
        if patterns.len() < 2 {
            debug!(
                found = patterns.len(),
                "fewer than two recurring method patterns, skipping base class synthesis"
            );
            return;
        }

        let prompt = format!(
            "Recurring method-name patterns across this repository's capabilities: {:?}\n\
             Propose one minimal abstract base class per pattern as JSON: \
             {{\"bases\": [{{\"name\": str, \"doc\": str, \"signature\": str}}]}}",
            patterns,
        );

        let bases = match self.gateway.generate_json(&prompt, 0.2, 400, None) {
            Ok((value, _)) => serde_json::from_value::<BaseClassPlan>(value)
                .map(|plan| plan.bases)
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        };

        let home_folder = folder_ids
            .iter()
            .find(|id| id.contains("core"))
            .or_else(|| folder_ids.first())
            .cloned();

        for base in bases {
            let id = format!("base::{}", base.name);
            let doc = if base.doc.is_empty() {
                format!("Abstract base synthesized for the {} pattern", base.name)
            } else {
                base.doc
            };
            let signature = if base.signature.is_empty() {
                format!("class {}", base.name)
            } else {
                base.signature
            };

            graph.add_node(Node {
                id: id.clone(),
                kind: NodeKind::Class,
                name: base.name,
                path_hint: home_folder.as_ref().map(|f| f.trim_start_matches("folder::").to_string()),
                signature: Some(signature),
                doc: Some(doc),
                children: Vec::new(),
                meta: NodeMeta::default(),
            });

            if let Some(folder) = &home_folder
                && let Some(folder_node) = graph.node_mut(folder)
            {
                folder_node.children.push(id);
            }
        }
    }

    /// A pattern "recurs" when both halves of a known pair show up in the leaf feature names
    /// of at least two distinct files.
    fn detect_recurring_patterns(&self, graph: &RepoGraph, file_ids: &[String]) -> Vec<String> {
        let mut files_by_pattern: HashMap<String, HashSet<String>> = HashMap::new();

        for file_id in file_ids {
            let Some(file_node) = graph.node(file_id) else { continue };
            let leaf_names: Vec<String> = file_node
                .meta
                .features
                .iter()
                .filter_map(|fp| fp.rsplit('/').next().map(str::to_lowercase))
                .collect();

            for (a, b) in RECURRING_PATTERN_PAIRS {
                let has_a = leaf_names.iter().any(|name| name.contains(a));
                let has_b = leaf_names.iter().any(|name| name.contains(b));
                if has_a && has_b {
                    files_by_pattern.entry(format!("{a}/{b}")).or_default().insert(file_id.clone());
                }
            }
        }

        let mut recurring: Vec<String> = files_by_pattern
            .into_iter()
            .filter(|(_, files)| files.len() >= 2)
            .map(|(pattern, _)| pattern)
            .collect();
        recurring.sort();
        recurring
    }

    fn b2_per_file_interfaces(
        &self,
        graph: &RepoGraph,
        file_ids: &[String],
    ) -> HashMap<String, String> {
        let mut interfaces = HashMap::new();
        for file_id in file_ids {
            let Some(file_node) = graph.node(file_id) else { continue };
            let prompt = format!(
                "File capabilities: {:?}\nWrite imports plus one typed, documented stub per \
                 capability with an empty body. Return only source code.",
                file_node.meta.features,
            );
            let result = self.gateway.generate(&prompt, 0.2, 600, None);
            if result.ok {
                interfaces.insert(file_node.path_hint.clone().unwrap_or_default(), result.content);
            }
        }
        interfaces
    }

    fn b2_materialize_declarations(
        &self,
        graph: &mut RepoGraph,
        file_ids: &[String],
        interfaces: &HashMap<String, String>,
    ) {
        for file_id in file_ids.to_vec() {
            let Some(path_hint) = graph.node(&file_id).and_then(|n| n.path_hint.clone()) else {
                continue;
            };
            let Some(source) = interfaces.get(&path_hint) else { continue };
            for (index, decl) in scan_declarations(source).into_iter().enumerate() {
                let decl_id = format!("{file_id}::{index}::{}", decl.name);
                graph.add_node(Node {
                    id: decl_id.clone(),
                    kind: decl.kind,
                    name: decl.name,
                    path_hint: Some(path_hint.clone()),
                    signature: Some(decl.line),
                    doc: Some(format!("Generated stub declared in {path_hint}")),
                    children: Vec::new(),
                    meta: NodeMeta::default(),
                });
                if let Some(file_node) = graph.node_mut(&file_id) {
                    file_node.children.push(decl_id.clone());
                }
                graph.add_edge(Edge::new(file_id.clone(), decl_id, EdgeKind::DependsOn));
            }
        }
    }
}

fn parse_file_assignment(value: &Value) -> BTreeMap<String, Vec<String>> {
    let Some(obj) = value.as_object() else { return BTreeMap::new() };
    obj.iter()
        .filter_map(|(file_path, features)| {
            let features: Vec<String> = features
                .as_array()?
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
            Some((file_path.clone(), features))
        })
        .collect()
}

fn fallback_file_assignment(grouped: &BTreeMap<String, Vec<String>>) -> BTreeMap<String, Vec<String>> {
    let mut assignment = BTreeMap::new();
    let mut index = 0;
    for features in grouped.values() {
        for feature in features {
            let file_path = format!("src/core/module_{index}.rs");
            assignment.entry(file_path).or_insert_with(Vec::new).push(feature.clone());
            index += 1;
        }
    }
    assignment
}

fn containing_folder(file_path: &str, folder_ids: &[String]) -> Option<String> {
    folder_ids
        .iter()
        .filter(|id| {
            let name = id.trim_start_matches("folder::");
            file_path.starts_with(name)
        })
        .max_by_key(|id| id.len())
        .cloned()
}

struct Declaration {
    kind: NodeKind,
    name: String,
    line: String,
}

/// Line-scanner for top-level declarations; intentionally not a parser. Recognizes lines
/// starting with `class ` / `def ` (Python-shaped stubs, the profile B2 targets by default)
/// and `fn ` / `struct ` (Rust-shaped stubs), ignoring indentation to find only top-level forms.
fn scan_declarations(source: &str) -> Vec<Declaration> {
    let mut declarations = Vec::new();
    for line in source.lines() {
        if line.starts_with(char::is_whitespace) {
            continue;
        }
        let trimmed = line.trim_end();
        if let Some(rest) = trimmed.strip_prefix("class ") {
            let name = rest.split(&['(', ':'][..]).next().unwrap_or(rest).trim().to_string();
            declarations.push(Declaration { kind: NodeKind::Class, name, line: trimmed.to_string() });
        } else if let Some(rest) = trimmed.strip_prefix("def ") {
            let name = rest.split('(').next().unwrap_or(rest).trim().to_string();
            declarations.push(Declaration { kind: NodeKind::Function, name, line: trimmed.to_string() });
        } else if let Some(rest) = trimmed.strip_prefix("pub struct ") {
            let name = rest.split(&['(', '{', ' '][..]).next().unwrap_or(rest).trim().to_string();
            declarations.push(Declaration { kind: NodeKind::Class, name, line: trimmed.to_string() });
        } else if let Some(rest) = trimmed.strip_prefix("pub fn ") {
            let name = rest.split('(').next().unwrap_or(rest).trim().to_string();
            declarations.push(Declaration { kind: NodeKind::Function, name, line: trimmed.to_string() });
        }
    }
    declarations
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpg_llm::DeterministicProvider;

    #[test]
    fn scan_declarations_finds_python_style_top_level_forms() {
        let source = "import os\n\nclass Widget:\n    def build(self):\n        pass\n\ndef helper():\n    pass\n";
        let decls = scan_declarations(source);
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].name, "Widget");
        assert_eq!(decls[1].name, "helper");
    }

    #[test]
    fn fallback_file_assignment_gives_one_file_per_leaf() {
        let mut grouped = BTreeMap::new();
        grouped.insert("math/basic".to_string(), vec!["math/basic/add".to_string(), "math/basic/sub".to_string()]);
        let assignment = fallback_file_assignment(&grouped);
        assert_eq!(assignment.len(), 2);
    }

    #[tokio::test]
    async fn folder_skeleton_falls_back_on_malformed_json() {
        let gateway = LlmGateway::new(Box::new(DeterministicProvider::new(vec!["not json".to_string()])));
        let controller = ImplementationController::new(&gateway);
        let mut graph = RepoGraph::new();
        let folder_ids = controller.b1_folder_skeleton(&mut graph, &["math".to_string()]);
        assert_eq!(folder_ids.len(), FALLBACK_FOLDERS.len());
    }

    fn file_node_with_features(graph: &mut RepoGraph, id: &str, features: &[&str]) {
        graph.add_node(Node {
            id: id.to_string(),
            kind: NodeKind::File,
            name: id.to_string(),
            path_hint: Some(id.to_string()),
            signature: None,
            doc: None,
            children: Vec::new(),
            meta: NodeMeta {
                features: features.iter().map(|s| (*s).to_string()).collect(),
                ..Default::default()
            },
        });
    }

    #[test]
    fn detect_recurring_patterns_requires_at_least_two_files_per_pattern() {
        let gateway = LlmGateway::new(Box::new(DeterministicProvider::new(vec![])));
        let controller = ImplementationController::new(&gateway);
        let mut graph = RepoGraph::new();
        file_node_with_features(&mut graph, "file::a", &["ml/model/fit", "ml/model/predict"]);

        let file_ids = vec!["file::a".to_string()];
        assert!(controller.detect_recurring_patterns(&graph, &file_ids).is_empty());
    }

    #[test]
    fn detect_recurring_patterns_finds_patterns_recurring_across_files() {
        let gateway = LlmGateway::new(Box::new(DeterministicProvider::new(vec![])));
        let controller = ImplementationController::new(&gateway);
        let mut graph = RepoGraph::new();
        file_node_with_features(&mut graph, "file::a", &["ml/model/fit", "ml/model/predict"]);
        file_node_with_features(&mut graph, "file::b", &["ml/cluster/fit", "ml/cluster/predict"]);

        let file_ids = vec!["file::a".to_string(), "file::b".to_string()];
        let patterns = controller.detect_recurring_patterns(&graph, &file_ids);
        assert_eq!(patterns, vec!["fit/predict".to_string()]);
    }

    #[tokio::test]
    async fn base_classes_skipped_when_fewer_than_two_patterns_found() {
        let gateway = LlmGateway::new(Box::new(DeterministicProvider::new(vec![
            "{\"bases\": [{\"name\": \"Estimator\", \"doc\": \"\", \"signature\": \"\"}]}".to_string(),
        ])));
        let controller = ImplementationController::new(&gateway);
        let mut graph = RepoGraph::new();
        file_node_with_features(&mut graph, "file::a", &["ml/model/fit", "ml/model/predict"]);

        let file_ids = vec!["file::a".to_string()];
        controller.b2_base_classes(&mut graph, &[], &file_ids);
        assert!(graph.nodes.values().all(|n| n.kind != NodeKind::Class));
    }

    #[tokio::test]
    async fn base_classes_materialized_when_two_patterns_recur() {
        let gateway = LlmGateway::new(Box::new(DeterministicProvider::new(vec![
            "{\"bases\": [{\"name\": \"Estimator\", \"doc\": \"Shared fit/predict contract\", \"signature\": \"class Estimator\"}, \
              {\"name\": \"Transformer\", \"doc\": \"Shared transform/process contract\", \"signature\": \"class Transformer\"}]}"
                .to_string(),
        ])));
        let controller = ImplementationController::new(&gateway);
        let mut graph = RepoGraph::new();
        file_node_with_features(&mut graph, "file::a", &["ml/model/fit", "ml/model/predict"]);
        file_node_with_features(&mut graph, "file::b", &["ml/cluster/fit", "ml/cluster/predict"]);
        file_node_with_features(&mut graph, "file::c", &["data/loader/transform", "data/loader/process"]);
        file_node_with_features(&mut graph, "file::d", &["data/writer/transform", "data/writer/process"]);

        let file_ids = vec![
            "file::a".to_string(),
            "file::b".to_string(),
            "file::c".to_string(),
            "file::d".to_string(),
        ];
        controller.b2_base_classes(&mut graph, &[], &file_ids);

        let base_names: Vec<&str> = graph
            .nodes
            .values()
            .filter(|n| n.kind == NodeKind::Class)
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(base_names.len(), 2);
        assert!(base_names.contains(&"Estimator"));
        assert!(base_names.contains(&"Transformer"));
    }
}
