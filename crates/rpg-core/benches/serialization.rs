use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rpg_core::graph::{Edge, EdgeKind, Node, NodeMeta, NodeKind, RepoGraph};
use rpg_core::schema;

fn build_graph(node_count: usize) -> RepoGraph {
    let mut graph = RepoGraph::new();
    for i in 0..node_count {
        let path_hint = format!("src/module_{}.rs", i / 20);
        graph.add_node(Node {
            id: format!("fn-{i}"),
            kind: NodeKind::Function,
            name: format!("func_{i}"),
            path_hint: Some(path_hint),
            signature: Some(format!("fn func_{i}()")),
            doc: Some("generated".to_string()),
            children: Vec::new(),
            meta: NodeMeta::default(),
        });
        if i > 0 {
            graph.add_edge(Edge::new(format!("fn-{}", i - 1), format!("fn-{i}"), EdgeKind::DependsOn));
        }
    }
    graph
}

fn bench_serialize(c: &mut Criterion) {
    let graph = build_graph(2000);
    c.bench_function("serialize_2000_nodes", |b| {
        b.iter(|| black_box(schema::to_json(&graph).unwrap()));
    });
}

fn bench_round_trip(c: &mut Criterion) {
    let graph = build_graph(2000);
    let json = schema::to_json(&graph).unwrap();
    c.bench_function("deserialize_2000_nodes", |b| {
        b.iter(|| black_box(schema::from_json(&json).unwrap()));
    });
}

fn bench_topological_sort(c: &mut Criterion) {
    let graph = build_graph(2000);
    c.bench_function("topo_sort_2000_nodes", |b| {
        b.iter(|| black_box(graph.topological_sort().unwrap()));
    });
}

criterion_group!(benches, bench_serialize, bench_round_trip, bench_topological_sort);
criterion_main!(benches);
