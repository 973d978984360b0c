//! Materializes accepted feature paths into a capability subgraph (§4.5).
//!
//! Every `/`-separated prefix of an accepted path becomes (or reuses) one capability node,
//! linked to its parent prefix by a `depends_on` containment edge. A fixed, data-driven table
//! of cross-links then adds lateral `depends_on` edges between capabilities that commonly
//! collaborate, independent of path containment.

use rpg_core::graph::{Edge, EdgeKind, Node, RepoGraph};

/// Lateral links between capability domains that recur across goals regardless of path shape.
/// Kept as a plain data table (not hardcoded into the walk below) so it can move into config
/// without an API break.
pub const CROSS_LINKS: &[(&str, &str)] = &[
    ("data/loading", "data/preprocessing"),
    ("data/preprocessing", "ml/data"),
    ("ml/data", "ml/algorithms"),
    ("ml/algorithms", "ml/evaluation"),
    ("ml/evaluation", "ml/reporting"),
    ("api/routes", "api/middleware"),
    ("auth/login", "auth/session"),
];

/// Insert one capability node per prefix of `feature_path`, reusing existing nodes by
/// feature path, and wire parent/child `depends_on` edges along the way. Returns the id of
/// the leaf capability node for `feature_path`.
pub fn ensure_capability_path(graph: &mut RepoGraph, feature_path: &str) -> String {
    let segments: Vec<&str> = feature_path.split('/').filter(|s| !s.is_empty()).collect();
    let mut parent_id: Option<String> = None;
    let mut prefix = String::new();

    for segment in &segments {
        if !prefix.is_empty() {
            prefix.push('/');
        }
        prefix.push_str(segment);

        let id = if let Some(existing) = graph.capability_by_feature_path(&prefix) {
            existing.id.clone()
        } else {
            let node_id = slug(&prefix);
            graph.add_node(Node::capability(node_id.clone(), *segment, &prefix));
            node_id
        };

        if let Some(parent) = &parent_id {
            if parent != &id {
                let already_linked = graph
                    .outgoing(parent)
                    .iter()
                    .any(|e| e.to == id && e.kind == EdgeKind::DependsOn);
                if !already_linked {
                    graph.add_edge(
                        Edge::new(parent.clone(), id.clone(), EdgeKind::DependsOn)
                            .with_note("hierarchical containment"),
                    );
                    if let Some(parent_node) = graph.node_mut(parent) {
                        if !parent_node.children.contains(&id) {
                            parent_node.children.push(id.clone());
                        }
                    }
                }
            }
        }
        parent_id = Some(id);
    }

    parent_id.unwrap_or_default()
}

/// Add the fixed cross-link table's edges wherever both endpoints exist as capabilities.
pub fn apply_cross_links(graph: &mut RepoGraph) {
    for &(from_path, to_path) in CROSS_LINKS {
        let (Some(from), Some(to)) = (
            graph.capability_by_feature_path(from_path).map(|n| n.id.clone()),
            graph.capability_by_feature_path(to_path).map(|n| n.id.clone()),
        ) else {
            continue;
        };
        let already_linked = graph
            .outgoing(&from)
            .iter()
            .any(|e| e.to == to && e.kind == EdgeKind::DependsOn);
        if !already_linked {
            graph.add_edge(
                Edge::new(from, to, EdgeKind::DependsOn).with_note("cross-domain collaboration"),
            );
        }
    }
}

fn slug(path: &str) -> String {
    format!("cap::{path}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_capability_path_dedups_shared_prefixes() {
        let mut graph = RepoGraph::new();
        let leaf_a = ensure_capability_path(&mut graph, "data/loading/csv");
        let leaf_b = ensure_capability_path(&mut graph, "data/loading/json");

        assert_ne!(leaf_a, leaf_b);
        assert!(graph.capability_by_feature_path("data").is_some());
        assert!(graph.capability_by_feature_path("data/loading").is_some());

        let loading_id = graph.capability_by_feature_path("data/loading").unwrap().id.clone();
        assert_eq!(graph.outgoing(&loading_id).len(), 2);
    }

    #[test]
    fn cross_links_connect_known_domains() {
        let mut graph = RepoGraph::new();
        ensure_capability_path(&mut graph, "data/loading/csv");
        ensure_capability_path(&mut graph, "data/preprocessing/normalize");
        apply_cross_links(&mut graph);

        let loading_id = graph.capability_by_feature_path("data/loading").unwrap().id.clone();
        let preprocessing_id = graph
            .capability_by_feature_path("data/preprocessing")
            .unwrap()
            .id
            .clone();
        assert!(graph
            .outgoing(&loading_id)
            .iter()
            .any(|e| e.to == preprocessing_id));
    }

    #[test]
    fn cross_links_skip_absent_domains() {
        let mut graph = RepoGraph::new();
        ensure_capability_path(&mut graph, "data/loading/csv");
        apply_cross_links(&mut graph);
        assert!(graph.validate().is_ok());
    }
}
