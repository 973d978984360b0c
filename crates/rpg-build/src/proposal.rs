//! Proposal Controller (§4.5): Algorithm 1's exploit/explore/missing feature accumulation loop.

use crate::acceptance;
use crate::capability_graph;
use rpg_core::config::ProposalConfig;
use rpg_core::graph::{FeatureSource, RepoGraph};
use rpg_embed::{EmbeddingStore, FeaturePath};
use rpg_llm::LlmGateway;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// A candidate feature pulled from one of the three sub-phases, awaiting the acceptance gate.
struct Candidate {
    path: String,
    score: f64,
    source: FeatureSource,
}

/// Drives Algorithm 1 to convergence and materializes the resulting capability graph.
pub struct ProposalController<'a> {
    store: &'a EmbeddingStore,
    gateway: &'a LlmGateway,
    config: &'a ProposalConfig,
}

impl<'a> ProposalController<'a> {
    #[must_use]
    pub fn new(store: &'a EmbeddingStore, gateway: &'a LlmGateway, config: &'a ProposalConfig) -> Self {
        Self { store, gateway, config }
    }

    /// Run the accumulation loop for `goal`, returning a graph populated with capability nodes
    /// (and the loop's final `selected`/`rejected` sets, for diagnostics or resumption).
    pub async fn run(&self, goal: &str) -> (RepoGraph, HashSet<String>, HashSet<String>) {
        let mut selected: HashSet<String> = HashSet::new();
        let mut rejected: HashSet<String> = HashSet::new();
        let mut provenance: HashMap<String, (FeatureSource, f64)> = HashMap::new();
        let domain_filter = self.config.domain_filter.as_deref();

        for i in 0..self.config.max_iterations {
            let exploit = self.exploit(goal, i, &selected, domain_filter).await;
            let explore = self.explore(&selected, domain_filter).await;
            let missing = self.missing(&selected).await;

            let mut accepted_this_round = 0usize;
            for candidate in exploit.into_iter().chain(explore).chain(missing) {
                match acceptance::accept(&candidate.path, candidate.score, &selected, &rejected) {
                    Ok(()) => {
                        provenance.insert(candidate.path.clone(), (candidate.source, candidate.score));
                        selected.insert(candidate.path);
                        accepted_this_round += 1;
                    }
                    Err(_) => {
                        rejected.insert(candidate.path);
                    }
                }
            }

            debug!(iteration = i, accepted = accepted_this_round, "proposal iteration complete");
            if accepted_this_round == 0 {
                info!(iteration = i, "proposal loop converged, terminating early");
                break;
            }
        }

        let mut graph = RepoGraph::new();
        graph.metadata.goal = Some(goal.to_string());
        let mut ordered: Vec<&String> = selected.iter().collect();
        ordered.sort();
        for path in ordered {
            let leaf_id = capability_graph::ensure_capability_path(&mut graph, path);
            if let Some((source, score)) = provenance.get(path) {
                if let Some(node) = graph.node_mut(&leaf_id) {
                    node.meta.source = Some(*source);
                    node.meta.score = Some(*score);
                }
            }
        }
        capability_graph::apply_cross_links(&mut graph);

        (graph, selected, rejected)
    }

    async fn exploit(
        &self,
        goal: &str,
        iteration: usize,
        selected: &HashSet<String>,
        domain_filter: Option<&str>,
    ) -> Vec<Candidate> {
        let k = 20 + 5 * iteration;
        let hits = match self.store.search(goal, k, domain_filter, 0.0).await {
            Ok(hits) => hits,
            Err(_) => return Vec::new(),
        };

        let mut tail: Vec<&String> = selected.iter().collect();
        tail.sort();
        let tail: Vec<&String> = tail.into_iter().rev().take(10).collect();

        let candidate_list: Vec<&str> = hits.iter().map(|h| h.path.path.as_str()).collect();
        let prompt = format!(
            "Project goal: {goal}\nCandidate features:\n{}\nCurrently selected (tail): {:?}\n\
             Select 3-5 of the candidate features essential to the goal. Respond as a JSON array \
             of feature path strings.",
            candidate_list.join("\n"),
            tail,
        );

        let parsed = self.gateway.generate_json(&prompt, 0.1, 600, None);
        self.to_candidates(parsed, &hits, FeatureSource::Exploit)
    }

    async fn explore(&self, selected: &HashSet<String>, domain_filter: Option<&str>) -> Vec<Candidate> {
        let sampled = self.store.sample_diverse(selected, 10, domain_filter);
        if sampled.is_empty() {
            return Vec::new();
        }
        let names: Vec<&str> = sampled.iter().map(|p| p.path.as_str()).collect();
        let prompt = format!(
            "Diverse candidate features:\n{}\nPropose 1-2 additions that diversify coverage \
             without drifting from the goal. Respond as a JSON array of feature path strings.",
            names.join("\n"),
        );

        match self.gateway.generate_json(&prompt, 0.3, 300, None) {
            Ok((value, _)) => paths_from_json(&value)
                .into_iter()
                .map(|path| Candidate { path, score: 0.6, source: FeatureSource::Explore })
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    async fn missing(&self, selected: &HashSet<String>) -> Vec<Candidate> {
        let mut grouped: std::collections::BTreeMap<&str, Vec<&str>> = std::collections::BTreeMap::new();
        for path in selected {
            let top = path.split('/').next().unwrap_or(path);
            grouped.entry(top).or_default().push(path.as_str());
        }
        let summary: Vec<String> = grouped
            .iter()
            .map(|(segment, paths)| format!("{segment}: {}", paths.join(", ")))
            .collect();
        let prompt = format!(
            "Selected features grouped by top segment:\n{}\nIdentify missing categories or \
             features as a nested JSON object, 2-3 levels deep, whose leaves are feature names.",
            summary.join("\n"),
        );

        match self.gateway.generate_json(&prompt, 0.4, 400, None) {
            Ok((value, _)) => rpg_embed::ontology::flatten(&value)
                .into_iter()
                .map(|path| Candidate { path, score: 0.5, source: FeatureSource::Missing })
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    fn to_candidates(
        &self,
        parsed: Result<(Value, rpg_llm::Usage), rpg_llm::GatewayError>,
        hits: &[rpg_embed::Hit],
        source: FeatureSource,
    ) -> Vec<Candidate> {
        let Ok((value, _)) = parsed else { return Vec::new() };
        let selected_names = paths_from_json(&value);
        selected_names
            .into_iter()
            .map(|path| {
                let score = hits
                    .iter()
                    .find(|h| h.path.path == path)
                    .map(|h| f64::from(h.score))
                    .unwrap_or(0.7);
                Candidate { path, score, source }
            })
            .collect()
    }
}

fn paths_from_json(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}
