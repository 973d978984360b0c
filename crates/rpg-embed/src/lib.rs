//! Embedding store over feature paths (§4.2).
//!
//! Holds a parallel `Vec<FeaturePath>` and `Vec<Vec<f32>>` of L2-normalized embeddings and
//! answers nearest-neighbor queries by brute-force cosine similarity, following the corpus's
//! brute-force-is-fine-under-10k pattern rather than reaching for an ANN index.

pub mod naturalize;
pub mod ontology;
pub mod provider;
pub mod store;

pub use provider::{DeterministicProvider, EmbeddingProvider, RemoteProvider};
pub use store::{EmbeddingStore, Hit};

use rpg_core::graph::FeatureSource;
use serde::{Deserialize, Serialize};

/// A single entry in the store: a slash-delimited feature path plus provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturePath {
    pub path: String,
    pub source: FeatureSource,
    pub score: f64,
}

impl FeaturePath {
    #[must_use]
    pub fn new(path: impl Into<String>, source: FeatureSource, score: f64) -> Self {
        Self {
            path: path.into(),
            source,
            score,
        }
    }
}
