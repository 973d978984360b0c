use rpg_core::error::GraphError;
use rpg_core::graph::{Edge, EdgeKind, Node, NodeKind, NodeMeta, RepoGraph};

fn capability(id: &str, feature_path: &str) -> Node {
    Node::capability(id, id, feature_path)
}

fn file_node(id: &str, path_hint: &str, features: &[&str]) -> Node {
    Node {
        id: id.to_string(),
        kind: NodeKind::File,
        name: id.to_string(),
        path_hint: Some(path_hint.to_string()),
        signature: None,
        doc: None,
        children: Vec::new(),
        meta: NodeMeta {
            features: features.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        },
    }
}

fn callable(id: &str, path_hint: &str) -> Node {
    Node {
        id: id.to_string(),
        kind: NodeKind::Function,
        name: id.to_string(),
        path_hint: Some(path_hint.to_string()),
        signature: Some(format!("fn {id}()")),
        doc: Some("does something".to_string()),
        children: Vec::new(),
        meta: NodeMeta::default(),
    }
}

/// Invariant 3: no two capability nodes share a feature_path.
#[test]
fn capability_graph_rejects_duplicate_feature_paths() {
    let mut graph = RepoGraph::new();
    graph.add_node(capability("math", "math"));
    graph.add_node(capability("math2", "math"));
    assert!(matches!(
        graph.validate(),
        Err(GraphError::DuplicateFeaturePath { .. })
    ));
}

/// Invariant 4: a file's meta.features must be a subset of known capability feature_paths.
#[test]
fn file_features_must_reference_existing_capabilities() {
    let mut graph = RepoGraph::new();
    graph.add_node(capability("add", "math/basic/add"));
    graph.add_node(file_node("calc", "src/calc.py", &["math/basic/add"]));
    assert!(graph.validate().is_ok());

    let mut bad = RepoGraph::new();
    bad.add_node(file_node("calc", "src/calc.py", &["math/basic/subtract"]));
    assert!(matches!(
        bad.validate(),
        Err(GraphError::UnknownFileFeature { .. })
    ));
}

/// Invariant 7 precondition: class/function nodes must carry a full signature and doc.
#[test]
fn callable_nodes_require_signature_and_doc() {
    let mut graph = RepoGraph::new();
    let mut incomplete = callable("add", "src/calc.py");
    incomplete.doc = None;
    graph.add_node(incomplete);
    assert!(matches!(
        graph.validate(),
        Err(GraphError::IncompleteInterface { .. })
    ));
}

/// Invariant 6: topological sort returns exactly the class/function nodes, ordered so that
/// every data_flow/order predecessor precedes its dependents.
#[test]
fn topological_sort_orders_callables_and_excludes_everything_else() {
    let mut graph = RepoGraph::new();
    graph.add_node(capability("math", "math/basic"));
    graph.add_node(file_node("calc", "src/calc.py", &[]));
    graph.add_node(callable("add", "src/calc.py"));
    graph.add_node(callable("subtract", "src/calc.py"));
    graph.add_edge(Edge::new("add", "subtract", EdgeKind::Order));

    let order = graph.topological_sort().unwrap();
    assert_eq!(order, vec!["add".to_string(), "subtract".to_string()]);
}

/// Invariant 1: the subgraph over {data_flow, order} must be acyclic; depends_on cycles
/// through shared ancestors (hierarchical containment) are permitted.
#[test]
fn acyclicity_check_is_scoped_to_data_flow_and_order_edges() {
    let mut graph = RepoGraph::new();
    graph.add_node(capability("a", "a"));
    graph.add_node(capability("b", "a/b"));
    graph.add_edge(Edge::new("a", "b", EdgeKind::DependsOn));
    graph.add_edge(Edge::new("b", "a", EdgeKind::DependsOn));
    assert!(graph.validate().is_ok());

    graph.add_node(callable("f", "src/x.py"));
    graph.add_node(callable("g", "src/x.py"));
    graph.add_edge(Edge::new("f", "g", EdgeKind::Order));
    graph.add_edge(Edge::new("g", "f", EdgeKind::Order));
    assert!(matches!(
        graph.validate(),
        Err(GraphError::CycleDetected { .. })
    ));
}

/// Invariant 2: every edge endpoint resolves to a node in the same graph.
#[test]
fn referential_integrity_catches_dangling_endpoints() {
    let mut graph = RepoGraph::new();
    graph.add_node(capability("a", "a"));
    graph.add_edge(Edge::new("a", "ghost", EdgeKind::DependsOn));
    assert!(matches!(
        graph.validate(),
        Err(GraphError::DanglingEdge { .. })
    ));
}

#[test]
fn neighborhood_query_uses_undirected_projection() {
    let mut graph = RepoGraph::new();
    graph.add_node(capability("a", "a"));
    graph.add_node(capability("b", "a/b"));
    graph.add_node(capability("c", "a/b/c"));
    graph.add_edge(Edge::new("a", "b", EdgeKind::DependsOn));
    graph.add_edge(Edge::new("c", "b", EdgeKind::DependsOn));

    let names: Vec<&str> = graph.neighborhood("b", 1).into_iter().map(|n| n.id.as_str()).collect();
    assert_eq!(names, vec!["a", "c"]);
}
