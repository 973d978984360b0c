//! Graph data model for the Repository Planning Graph (RPG): `G = (V, E)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::error::GraphError;

/// The kind of a node. Capabilities come from Stage A, folders/files from Stage B1,
/// classes/functions from Stage B2's interface parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Capability,
    Folder,
    File,
    Class,
    Function,
}

impl NodeKind {
    #[must_use]
    pub fn is_callable(self) -> bool {
        matches!(self, Self::Class | Self::Function)
    }
}

/// The source a feature path (and the capability node built from it) was selected by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSource {
    Exploit,
    Explore,
    Missing,
    Ontology,
}

/// A single node in the RPG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub meta: NodeMeta,
}

/// Recognized `meta` keys, kept as a typed struct rather than a free `serde_json::Value` map
/// so producers and validators agree on shape; unrecognized keys round-trip via `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<FeatureSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface_spec: Option<bool>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Node {
    #[must_use]
    pub fn capability(id: impl Into<String>, name: impl Into<String>, feature_path: &str) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::Capability,
            name: name.into(),
            path_hint: None,
            signature: None,
            doc: None,
            children: Vec::new(),
            meta: NodeMeta {
                feature_path: Some(feature_path.to_string()),
                ..Default::default()
            },
        }
    }
}

/// The type of an edge. Only `data_flow` and `order` participate in the acyclicity
/// invariant; `depends_on` covers containment-derived and logical cross-links and may
/// legitimately form cycles through shared ancestors (e.g. diamond containment), so it
/// is excluded from the DAG check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    DataFlow,
    DependsOn,
    Order,
}

/// A single edge in the RPG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Edge {
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>, kind: EdgeKind) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind,
            data_id: None,
            data_type: None,
            note: None,
        }
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Run-level metadata carried alongside the graph (not part of the graph-theoretic model,
/// but needed to reproduce or audit a run).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub stage: StageMarker,
}

/// Which stage last produced this graph. Stages only ever extend a graph, never replace it,
/// so this marker is monotonically non-decreasing within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageMarker {
    #[default]
    Proposal,
    Implementation,
    Codegen,
}

/// The Repository Planning Graph: `G = (V, E)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoGraph {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: GraphMetadata,
    pub nodes: BTreeMap<String, Node>,
    pub edges: Vec<Edge>,
    /// Performance index: node id -> indices into `edges` where it is the `from` endpoint.
    /// Rebuilt on load and after bulk edge mutation via `rebuild_edge_index`.
    #[serde(skip)]
    pub out_index: HashMap<String, Vec<usize>>,
    /// Performance index: node id -> indices into `edges` where it is the `to` endpoint.
    #[serde(skip)]
    pub in_index: HashMap<String, Vec<usize>>,
}

impl Default for RepoGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl RepoGraph {
    pub const CURRENT_VERSION: &'static str = "1.0.0";

    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            version: Self::CURRENT_VERSION.to_string(),
            created_at: now,
            updated_at: now,
            metadata: GraphMetadata::default(),
            nodes: BTreeMap::new(),
            edges: Vec::new(),
            out_index: HashMap::new(),
            in_index: HashMap::new(),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Insert a node, or return its id unchanged if a node with that id already exists.
    /// Nodes are append-only by design (§3 Lifecycles); callers that need to extend an
    /// existing node use `node_mut` and append to `children`/`meta`.
    pub fn add_node(&mut self, node: Node) -> &str {
        let id = node.id.clone();
        self.nodes.entry(id.clone()).or_insert(node);
        self.touch();
        self.nodes.get_key_value(&id).expect("just inserted").0
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn add_edge(&mut self, edge: Edge) {
        let idx = self.edges.len();
        self.out_index.entry(edge.from.clone()).or_default().push(idx);
        self.in_index.entry(edge.to.clone()).or_default().push(idx);
        self.edges.push(edge);
        self.touch();
    }

    pub fn rebuild_edge_index(&mut self) {
        self.out_index.clear();
        self.in_index.clear();
        for (idx, edge) in self.edges.iter().enumerate() {
            self.out_index.entry(edge.from.clone()).or_default().push(idx);
            self.in_index.entry(edge.to.clone()).or_default().push(idx);
        }
    }

    #[must_use]
    pub fn children(&self, id: &str) -> Vec<&Node> {
        self.node(id)
            .map(|n| n.children.iter().filter_map(|c| self.node(c)).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn outgoing(&self, id: &str) -> Vec<&Edge> {
        self.out_index
            .get(id)
            .map(|idxs| idxs.iter().map(|&i| &self.edges[i]).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn incoming(&self, id: &str) -> Vec<&Edge> {
        self.in_index
            .get(id)
            .map(|idxs| idxs.iter().map(|&i| &self.edges[i]).collect())
            .unwrap_or_default()
    }

    /// Find a capability node by its `feature_path`, used to dedupe prefixes during
    /// capability graph construction (§4.5).
    #[must_use]
    pub fn capability_by_feature_path(&self, feature_path: &str) -> Option<&Node> {
        self.nodes.values().find(|n| {
            n.kind == NodeKind::Capability && n.meta.feature_path.as_deref() == Some(feature_path)
        })
    }

    /// Validation per §4.1: referential integrity, DAG check, interface completeness,
    /// containment forest, capability uniqueness, and file-feature subset check.
    pub fn validate(&self) -> Result<(), GraphError> {
        self.validate_referential_integrity()?;
        self.validate_containment_forest()?;
        self.validate_capability_uniqueness()?;
        self.validate_file_features()?;
        self.validate_interface_completeness()?;
        self.validate_acyclic()?;
        Ok(())
    }

    fn validate_referential_integrity(&self) -> Result<(), GraphError> {
        for edge in &self.edges {
            if !self.nodes.contains_key(&edge.from) {
                return Err(GraphError::DanglingEdge {
                    node_id: edge.from.clone(),
                });
            }
            if !self.nodes.contains_key(&edge.to) {
                return Err(GraphError::DanglingEdge {
                    node_id: edge.to.clone(),
                });
            }
        }
        for node in self.nodes.values() {
            for child in &node.children {
                if !self.nodes.contains_key(child) {
                    return Err(GraphError::DanglingEdge {
                        node_id: child.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn validate_containment_forest(&self) -> Result<(), GraphError> {
        let mut parent_of: HashMap<&str, &str> = HashMap::new();
        for node in self.nodes.values() {
            for child in &node.children {
                if let Some(existing) = parent_of.insert(child.as_str(), node.id.as_str()) {
                    if existing != node.id {
                        return Err(GraphError::MultipleParents {
                            node_id: child.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn validate_capability_uniqueness(&self) -> Result<(), GraphError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for node in self.nodes.values() {
            if node.kind != NodeKind::Capability {
                continue;
            }
            if let Some(fp) = node.meta.feature_path.as_deref() {
                if !seen.insert(fp) {
                    return Err(GraphError::DuplicateFeaturePath {
                        feature_path: fp.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn validate_file_features(&self) -> Result<(), GraphError> {
        let known: HashSet<&str> = self
            .nodes
            .values()
            .filter(|n| n.kind == NodeKind::Capability)
            .filter_map(|n| n.meta.feature_path.as_deref())
            .collect();
        for node in self.nodes.values() {
            if node.kind != NodeKind::File {
                continue;
            }
            for feature in &node.meta.features {
                if !known.contains(feature.as_str()) {
                    return Err(GraphError::UnknownFileFeature {
                        node_id: node.id.clone(),
                        feature_path: feature.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn validate_interface_completeness(&self) -> Result<(), GraphError> {
        for node in self.nodes.values() {
            if !node.kind.is_callable() {
                continue;
            }
            if node.signature.as_deref().unwrap_or("").is_empty()
                || node.doc.as_deref().unwrap_or("").is_empty()
            {
                return Err(GraphError::IncompleteInterface {
                    node_id: node.id.clone(),
                });
            }
        }
        Ok(())
    }

    /// DAG check on the subgraph induced by `{data_flow, order}` edges (invariant 1).
    fn validate_acyclic(&self) -> Result<(), GraphError> {
        let relevant: Vec<&Edge> = self
            .edges
            .iter()
            .filter(|e| matches!(e.kind, EdgeKind::DataFlow | EdgeKind::Order))
            .collect();

        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &relevant {
            adjacency
                .entry(edge.from.as_str())
                .or_default()
                .push(edge.to.as_str());
        }

        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }
        let mut color: HashMap<&str, Color> = self
            .nodes
            .keys()
            .map(|id| (id.as_str(), Color::White))
            .collect();

        fn visit<'a>(
            node: &'a str,
            adjacency: &HashMap<&'a str, Vec<&'a str>>,
            color: &mut HashMap<&'a str, Color>,
            stack: &mut Vec<String>,
        ) -> Option<Vec<String>> {
            color.insert(node, Color::Gray);
            stack.push(node.to_string());
            if let Some(neighbors) = adjacency.get(node) {
                for &next in neighbors {
                    match color.get(next).copied().unwrap_or(Color::White) {
                        Color::White => {
                            if let Some(cycle) = visit(next, adjacency, color, stack) {
                                return Some(cycle);
                            }
                        }
                        Color::Gray => {
                            let start = stack.iter().position(|n| n == next).unwrap_or(0);
                            let mut cycle = stack[start..].to_vec();
                            cycle.push(next.to_string());
                            return Some(cycle);
                        }
                        Color::Black => {}
                    }
                }
            }
            stack.pop();
            color.insert(node, Color::Black);
            None
        }

        let mut ids: Vec<&str> = self.nodes.keys().map(String::as_str).collect();
        ids.sort_unstable();
        for id in ids {
            if color.get(id).copied().unwrap_or(Color::White) == Color::White {
                let mut stack = Vec::new();
                if let Some(cycle) = visit(id, &adjacency, &mut color, &mut stack) {
                    return Err(GraphError::CycleDetected { members: cycle });
                }
            }
        }
        Ok(())
    }

    /// Topological sort restricted to `kind ∈ {class, function}`, ordered by
    /// `{data_flow, order}` predecessors. Ties are broken by `(path_hint, name)` so the
    /// result is reproducible across runs with identical input (invariant 6, invariant 8).
    pub fn topological_sort(&self) -> Result<Vec<String>, GraphError> {
        self.validate_acyclic()?;

        let callable: HashSet<&str> = self
            .nodes
            .values()
            .filter(|n| n.kind.is_callable())
            .map(|n| n.id.as_str())
            .collect();

        let mut indegree: HashMap<&str, usize> = callable.iter().map(|&id| (id, 0)).collect();
        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &self.edges {
            if !matches!(edge.kind, EdgeKind::DataFlow | EdgeKind::Order) {
                continue;
            }
            if !callable.contains(edge.from.as_str()) || !callable.contains(edge.to.as_str()) {
                continue;
            }
            adjacency
                .entry(edge.from.as_str())
                .or_default()
                .push(edge.to.as_str());
            *indegree.entry(edge.to.as_str()).or_insert(0) += 1;
        }

        let sort_key = |id: &str| -> (String, String) {
            let node = &self.nodes[id];
            (
                node.path_hint.clone().unwrap_or_default(),
                node.name.clone(),
            )
        };

        let mut ready: Vec<&str> = indegree
            .iter()
            .filter(|&(_, &deg)| deg == 0)
            .map(|(&id, _)| id)
            .collect();
        ready.sort_by_key(|&id| sort_key(id));

        let mut queue: VecDeque<&str> = ready.into();
        let mut order = Vec::with_capacity(callable.len());

        while let Some(id) = queue.pop_front() {
            order.push(id.to_string());
            if let Some(neighbors) = adjacency.get(id) {
                let mut unlocked = Vec::new();
                for &next in neighbors {
                    let deg = indegree.get_mut(next).expect("indegree tracked");
                    *deg -= 1;
                    if *deg == 0 {
                        unlocked.push(next);
                    }
                }
                unlocked.sort_by_key(|&id| sort_key(id));
                let mut merged: Vec<&str> = queue.iter().copied().collect();
                merged.extend(unlocked);
                merged.sort_by_key(|&id| sort_key(id));
                queue = merged.into();
            }
        }

        Ok(order)
    }

    /// Nodes reachable from `start` within `radius` hops over the undirected projection of
    /// `{data_flow, depends_on, order}` edges. Used by the Codegen controller's graph-guided
    /// repair prompt (§4.7) and by the embedding store's feature-neighborhood queries.
    #[must_use]
    pub fn neighborhood(&self, start: &str, radius: usize) -> Vec<&Node> {
        if !self.nodes.contains_key(start) {
            return Vec::new();
        }
        let mut undirected: HashMap<&str, HashSet<&str>> = HashMap::new();
        for edge in &self.edges {
            undirected
                .entry(edge.from.as_str())
                .or_default()
                .insert(edge.to.as_str());
            undirected
                .entry(edge.to.as_str())
                .or_default()
                .insert(edge.from.as_str());
        }

        let mut visited: HashSet<&str> = HashSet::from([start]);
        let mut frontier: Vec<&str> = vec![start];
        for _ in 0..radius {
            let mut next_frontier = Vec::new();
            for node in &frontier {
                if let Some(neighbors) = undirected.get(node) {
                    for &n in neighbors {
                        if visited.insert(n) {
                            next_frontier.push(n);
                        }
                    }
                }
            }
            if next_frontier.is_empty() {
                break;
            }
            frontier = next_frontier;
        }
        visited.remove(start);
        let mut result: Vec<&Node> = visited.into_iter().filter_map(|id| self.node(id)).collect();
        result.sort_by(|a, b| a.id.cmp(&b.id));
        result
    }

    /// Transitive dependency ids up to `depth`, following `depends_on`/`data_flow` edges
    /// backward (incoming to `start`) — used by the repair prompt's dependency context.
    #[must_use]
    pub fn transitive_dependencies(&self, start: &str, depth: usize) -> Vec<String> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut frontier: Vec<String> = vec![start.to_string()];
        for _ in 0..depth {
            let mut next_frontier = Vec::new();
            for node in &frontier {
                for edge in self.incoming(node) {
                    if matches!(edge.kind, EdgeKind::DependsOn | EdgeKind::DataFlow)
                        && visited.insert(edge.from.clone())
                    {
                        next_frontier.push(edge.from.clone());
                    }
                }
            }
            if next_frontier.is_empty() {
                break;
            }
            frontier = next_frontier;
        }
        let mut result: Vec<String> = visited.into_iter().collect();
        result.sort();
        result
    }
}
