//! Pluggable embedding backends.
//!
//! A real provider calls out to a local sentence-embedding model or a remote embeddings API; a
//! deterministic hashing provider produces stable pseudo-embeddings from input text so the
//! store is exercisable in tests and offline environments. Object-safe via manually boxed
//! futures rather than `async_trait`, matching how the rest of the corpus avoids that
//! dependency.

use anyhow::{Context, Result};
use rpg_core::config::EmbeddingConfig;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

pub trait EmbeddingProvider: Send + Sync {
    fn embed_batch<'a>(
        &'a self,
        texts: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>>> + Send + 'a>>;

    fn provider_name(&self) -> &str;

    fn dimension(&self) -> usize;
}

/// Construct a provider from configuration, following `provider` = "local" | "remote" |
/// "deterministic".
pub fn from_config(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "remote" => Ok(Box::new(RemoteProvider::from_config(config)?)),
        "deterministic" => Ok(Box::new(DeterministicProvider::new(config.dimension))),
        "local" => {
            #[cfg(feature = "local-embeddings")]
            {
                Ok(Box::new(LocalProvider::new()?))
            }
            #[cfg(not(feature = "local-embeddings"))]
            {
                anyhow::bail!(
                    "embedding.provider=local requires the 'local-embeddings' feature; \
                     rebuild with --features local-embeddings, or set provider to \
                     'remote' or 'deterministic'"
                )
            }
        }
        other => anyhow::bail!("unknown embedding provider: {other}"),
    }
}

/// Calls a remote embeddings API (OpenAI-shaped request/response).
pub struct RemoteProvider {
    base_url: String,
    api_key: String,
    model: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct RemoteRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct RemoteResponse {
    data: Vec<RemoteEmbedding>,
}

#[derive(Deserialize)]
struct RemoteEmbedding {
    embedding: Vec<f32>,
}

impl RemoteProvider {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var("RPG_EMBEDDING_API_KEY")
            .context("embedding.provider=remote but RPG_EMBEDDING_API_KEY is not set")?;
        let base_url = std::env::var("RPG_EMBEDDING_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1/embeddings".to_string());
        Ok(Self {
            base_url,
            api_key,
            model: config.model.clone(),
            http: reqwest::Client::new(),
        })
    }
}

impl EmbeddingProvider for RemoteProvider {
    fn embed_batch<'a>(
        &'a self,
        texts: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>>> + Send + 'a>> {
        Box::pin(async move {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            let req = RemoteRequest {
                model: &self.model,
                input: texts,
            };
            let resp = self
                .http
                .post(&self.base_url)
                .bearer_auth(&self.api_key)
                .json(&req)
                .send()
                .await
                .context("failed to call remote embeddings API")?;
            let body: RemoteResponse = resp
                .json()
                .await
                .context("failed to parse remote embeddings response")?;
            let mut embeddings: Vec<Vec<f32>> =
                body.data.into_iter().map(|d| d.embedding).collect();
            if embeddings.len() != texts.len() {
                anyhow::bail!(
                    "embedding count mismatch: expected {}, got {}",
                    texts.len(),
                    embeddings.len()
                );
            }
            for emb in &mut embeddings {
                normalize_l2(emb);
            }
            Ok(embeddings)
        })
    }

    fn provider_name(&self) -> &str {
        "remote"
    }

    fn dimension(&self) -> usize {
        0
    }
}

#[cfg(feature = "local-embeddings")]
pub struct LocalProvider {
    model: std::sync::Mutex<fastembed::TextEmbedding>,
}

#[cfg(feature = "local-embeddings")]
impl LocalProvider {
    pub fn new() -> Result<Self> {
        use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
        let model = TextEmbedding::try_new(InitOptions {
            model_name: EmbeddingModel::AllMiniLML6V2,
            ..Default::default()
        })
        .context("failed to initialize local embedding model")?;
        Ok(Self {
            model: std::sync::Mutex::new(model),
        })
    }
}

#[cfg(feature = "local-embeddings")]
impl EmbeddingProvider for LocalProvider {
    fn embed_batch<'a>(
        &'a self,
        texts: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>>> + Send + 'a>> {
        Box::pin(async move {
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            let mut embeddings = self
                .model
                .lock()
                .expect("lock poisoned")
                .embed(refs, None)
                .context("local embedding generation failed")?;
            for emb in &mut embeddings {
                normalize_l2(emb);
            }
            Ok(embeddings)
        })
    }

    fn provider_name(&self) -> &str {
        "local"
    }

    fn dimension(&self) -> usize {
        384
    }
}

/// Stable pseudo-embeddings derived from a text hash. No external dependency, fully
/// deterministic: the same text always yields the same vector.
pub struct DeterministicProvider {
    dimension: usize,
}

impl DeterministicProvider {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dimension];
        let mut state: u64 = 1469598103934665603; // FNV offset basis
        for byte in text.bytes() {
            state ^= u64::from(byte);
            state = state.wrapping_mul(1099511628211); // FNV prime
            let idx = (state as usize) % self.dimension;
            vec[idx] += 1.0;
        }
        normalize_l2(&mut vec);
        vec
    }
}

impl EmbeddingProvider for DeterministicProvider {
    fn embed_batch<'a>(
        &'a self,
        texts: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>>> + Send + 'a>> {
        let embeddings = texts.iter().map(|t| self.embed_one(t)).collect();
        Box::pin(async move { Ok(embeddings) })
    }

    fn provider_name(&self) -> &str {
        "deterministic"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

pub(crate) fn normalize_l2(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deterministic_provider_is_stable() {
        let provider = DeterministicProvider::new(32);
        let a = provider
            .embed_batch(&["math basic add".to_string()])
            .await
            .unwrap();
        let b = provider
            .embed_batch(&["math basic add".to_string()])
            .await
            .unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn deterministic_provider_distinguishes_inputs() {
        let provider = DeterministicProvider::new(32);
        let a = provider.embed_batch(&["alpha".to_string()]).await.unwrap();
        let b = provider.embed_batch(&["beta".to_string()]).await.unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn normalize_l2_produces_unit_vector() {
        let mut v = vec![3.0, 4.0];
        normalize_l2(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }
}
