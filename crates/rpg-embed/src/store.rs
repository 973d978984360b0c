//! The embedding store itself: a parallel list of `FeaturePath` and L2-normalized vectors.

use crate::naturalize::naturalize;
use crate::ontology;
use crate::provider::EmbeddingProvider;
use crate::FeaturePath;
use anyhow::Result;
use rand::seq::SliceRandom;
use rpg_core::graph::FeatureSource;
use serde_json::Value;
use std::collections::HashSet;

/// A search result: the stored path plus its cosine score against the query.
#[derive(Debug, Clone)]
pub struct Hit {
    pub path: FeaturePath,
    pub score: f32,
}

pub struct EmbeddingStore {
    provider: Box<dyn EmbeddingProvider>,
    paths: Vec<FeaturePath>,
    vectors: Vec<Vec<f32>>,
}

impl EmbeddingStore {
    #[must_use]
    pub fn new(provider: Box<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            paths: Vec::new(),
            vectors: Vec::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    #[must_use]
    pub fn paths(&self) -> &[FeaturePath] {
        &self.paths
    }

    /// Encode `natural-language(path)` for each given feature and append to the store.
    pub async fn add(&mut self, features: &[FeaturePath]) -> Result<()> {
        if features.is_empty() {
            return Ok(());
        }
        let texts: Vec<String> = features.iter().map(|f| naturalize(&f.path)).collect();
        let embeddings = self.provider.embed_batch(&texts).await?;
        self.paths.extend(features.iter().cloned());
        self.vectors.extend(embeddings);
        Ok(())
    }

    /// Inner-product search over the query text, filtered by domain prefix and score floor.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        domain_filter: Option<&str>,
        min_score: f32,
    ) -> Result<Vec<Hit>> {
        let query_vec = self
            .provider
            .embed_batch(std::slice::from_ref(&query.to_string()))
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();

        let mut hits: Vec<Hit> = self
            .paths
            .iter()
            .zip(self.vectors.iter())
            .filter(|(path, _)| passes_domain_filter(&path.path, domain_filter))
            .map(|(path, vector)| Hit {
                path: path.clone(),
                score: cosine_similarity(&query_vec, vector),
            })
            .filter(|hit| hit.score >= min_score)
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    /// Uniform sample without replacement from `paths \ exclude`, matching the given domain
    /// filter. Tagged `explore`, score 0.6, per the baseline contract.
    pub fn sample_diverse(
        &self,
        exclude: &HashSet<String>,
        k: usize,
        domain_filter: Option<&str>,
    ) -> Vec<FeaturePath> {
        let mut candidates: Vec<&FeaturePath> = self
            .paths
            .iter()
            .filter(|p| !exclude.contains(&p.path) && passes_domain_filter(&p.path, domain_filter))
            .collect();

        let mut rng = rand::thread_rng();
        candidates.shuffle(&mut rng);
        candidates
            .into_iter()
            .take(k)
            .map(|p| FeaturePath::new(p.path.clone(), FeatureSource::Explore, 0.6))
            .collect()
    }

    /// Flatten a nested ontology and append every leaf path, tagged `ontology`, score 0.5.
    pub async fn build_from_ontology(&mut self, tree: &Value) -> Result<usize> {
        let paths: Vec<FeaturePath> = ontology::flatten(tree)
            .into_iter()
            .map(|p| FeaturePath::new(p, FeatureSource::Ontology, 0.5))
            .collect();
        let added = paths.len();
        self.add(&paths).await?;
        Ok(added)
    }

    /// Nearest stored paths to an existing path's own embedding, excluding itself.
    #[must_use]
    pub fn neighbors(&self, path: &str, radius: usize) -> Vec<Hit> {
        let Some(idx) = self.paths.iter().position(|p| p.path == path) else {
            return Vec::new();
        };
        let anchor = &self.vectors[idx];

        let mut hits: Vec<Hit> = self
            .paths
            .iter()
            .zip(self.vectors.iter())
            .enumerate()
            .filter(|(i, _)| *i != idx)
            .map(|(_, (p, v))| Hit {
                path: p.clone(),
                score: cosine_similarity(anchor, v),
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(radius);
        hits
    }
}

fn passes_domain_filter(path: &str, domain_filter: Option<&str>) -> bool {
    match domain_filter {
        Some(prefix) => path.starts_with(prefix),
        None => true,
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::DeterministicProvider;

    fn feature(path: &str) -> FeaturePath {
        FeaturePath::new(path, FeatureSource::Exploit, 0.8)
    }

    #[tokio::test]
    async fn search_returns_top_k_above_threshold() {
        let mut store = EmbeddingStore::new(Box::new(DeterministicProvider::new(32)));
        store
            .add(&[
                feature("math/basic/add"),
                feature("math/basic/subtract"),
                feature("graphics/render/shader"),
            ])
            .await
            .unwrap();

        let hits = store.search("math basic add", 2, None, 0.0).await.unwrap();
        assert!(hits.len() <= 2);
        assert_eq!(hits[0].path.path, "math/basic/add");
    }

    #[tokio::test]
    async fn search_respects_domain_filter() {
        let mut store = EmbeddingStore::new(Box::new(DeterministicProvider::new(32)));
        store
            .add(&[feature("math/basic/add"), feature("graphics/render/shader")])
            .await
            .unwrap();

        let hits = store
            .search("add", 10, Some("graphics"), 0.0)
            .await
            .unwrap();
        assert!(hits.iter().all(|h| h.path.path.starts_with("graphics")));
    }

    #[tokio::test]
    async fn sample_diverse_excludes_given_set_and_tags_explore() {
        let mut store = EmbeddingStore::new(Box::new(DeterministicProvider::new(32)));
        store
            .add(&[feature("a/b"), feature("a/c"), feature("a/d")])
            .await
            .unwrap();
        let mut exclude = HashSet::new();
        exclude.insert("a/b".to_string());

        let sampled = store.sample_diverse(&exclude, 2, None);
        assert_eq!(sampled.len(), 2);
        assert!(sampled.iter().all(|p| p.path != "a/b"));
        assert!(sampled.iter().all(|p| p.source == FeatureSource::Explore));
    }

    #[tokio::test]
    async fn build_from_ontology_tags_entries_as_ontology() {
        let mut store = EmbeddingStore::new(Box::new(DeterministicProvider::new(32)));
        let tree = serde_json::json!({ "math": { "basic": ["add"] } });
        let added = store.build_from_ontology(&tree).await.unwrap();
        assert_eq!(added, 1);
        assert_eq!(store.paths()[0].source, FeatureSource::Ontology);
    }

    #[tokio::test]
    async fn neighbors_excludes_the_anchor_itself() {
        let mut store = EmbeddingStore::new(Box::new(DeterministicProvider::new(32)));
        store
            .add(&[feature("math/basic/add"), feature("math/basic/subtract")])
            .await
            .unwrap();
        let neighbors = store.neighbors("math/basic/add", 5);
        assert!(neighbors.iter().all(|h| h.path.path != "math/basic/add"));
    }
}
