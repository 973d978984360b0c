use rpg_core::config::StorageConfig;
use rpg_core::graph::{Edge, EdgeKind, Node, RepoGraph};
use rpg_core::storage;

fn sample_graph() -> RepoGraph {
    let mut graph = RepoGraph::new();
    graph.add_node(Node::capability("math", "Math", "math/basic"));
    graph.add_node(Node::capability("add", "Add", "math/basic/add"));
    graph.add_edge(
        Edge::new("math", "add", EdgeKind::DependsOn).with_note("hierarchical containment"),
    );
    graph
}

/// The round-trip law of §8: serialize then deserialize yields an equal graph under
/// id-preserving equivalence.
#[test]
fn uncompressed_round_trip_preserves_nodes_and_edges() {
    let tmp = tempfile::tempdir().unwrap();
    let graph = sample_graph();

    storage::save(tmp.path(), &graph).unwrap();
    let loaded = storage::load(tmp.path()).unwrap();

    assert_eq!(loaded.nodes.len(), graph.nodes.len());
    assert_eq!(loaded.edges.len(), graph.edges.len());
    for (id, node) in &graph.nodes {
        let restored = loaded.node(id).expect("node present after round trip");
        assert_eq!(restored.name, node.name);
        assert_eq!(restored.meta.feature_path, node.meta.feature_path);
    }
}

#[test]
fn compressed_round_trip_is_transparent_to_callers() {
    let tmp = tempfile::tempdir().unwrap();
    let graph = sample_graph();
    let config = StorageConfig {
        compress: true,
        ..Default::default()
    };

    storage::save_with_config(tmp.path(), &graph, &config).unwrap();
    let loaded = storage::load(tmp.path()).unwrap();

    assert_eq!(loaded.nodes.len(), graph.nodes.len());
}

#[test]
fn backup_is_created_before_overwrite() {
    let tmp = tempfile::tempdir().unwrap();
    let graph = sample_graph();
    storage::save(tmp.path(), &graph).unwrap();

    let backup = storage::create_backup(tmp.path()).unwrap();
    assert!(backup.is_some());
    assert!(storage::rpg_backup_file(tmp.path()).exists());
}

#[test]
fn gitignore_is_created_once() {
    let tmp = tempfile::tempdir().unwrap();
    let first = storage::ensure_gitignore(tmp.path()).unwrap();
    assert!(!first);
    let second = storage::ensure_gitignore(tmp.path()).unwrap();
    assert!(second);
}
