//! JSON schema validation and version handling for RPG files.

use crate::graph::RepoGraph;
use anyhow::{Context, Result};

/// Validate an RPG's schema version.
pub fn validate_version(graph: &RepoGraph) -> Result<()> {
    if graph.version != RepoGraph::CURRENT_VERSION {
        anyhow::bail!(
            "RPG version mismatch: expected {}, found {}",
            RepoGraph::CURRENT_VERSION,
            graph.version
        );
    }
    Ok(())
}

/// Serialize an RPG to a pretty-printed JSON string.
pub fn to_json(graph: &RepoGraph) -> Result<String> {
    serde_json::to_string_pretty(graph).context("failed to serialize RPG to JSON")
}

/// Deserialize an RPG from a JSON string (the round-trip law of §8).
pub fn from_json(json: &str) -> Result<RepoGraph> {
    let mut graph: RepoGraph =
        serde_json::from_str(json).context("failed to deserialize RPG from JSON")?;
    validate_version(&graph)?;
    graph.rebuild_edge_index();
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, EdgeKind, Node};

    #[test]
    fn round_trips_a_graph_with_edges() {
        let mut graph = RepoGraph::new();
        graph.add_node(Node::capability("a", "A", "x/a"));
        graph.add_node(Node::capability("b", "B", "x/b"));
        graph.add_edge(Edge::new("a", "b", EdgeKind::DependsOn));

        let json = to_json(&graph).unwrap();
        let restored = from_json(&json).unwrap();

        assert_eq!(restored.nodes.len(), graph.nodes.len());
        assert_eq!(restored.edges.len(), graph.edges.len());
        assert_eq!(restored.outgoing("a").len(), 1);
    }

    #[test]
    fn rejects_mismatched_version() {
        let json = r#"{"version":"0.0.1","created_at":"2024-01-01T00:00:00Z","updated_at":"2024-01-01T00:00:00Z","metadata":{},"nodes":{},"edges":[]}"#;
        assert!(from_json(json).is_err());
    }
}
