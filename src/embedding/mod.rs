//! Text-to-vector embedding providers.
//!
//! Provides the [`EmbeddingProvider`] trait, a deterministic offline
//! implementation ([`hash::HashEmbeddingProvider`]) and an OpenAI-compatible
//! HTTP implementation ([`http::HttpEmbeddingProvider`]). Providers are created
//! via [`create_provider`] from configuration.

pub mod hash;
pub mod http;

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};

/// Trait for embedding text into vectors.
///
/// All methods are synchronous; async callers go through [`embed_bounded`],
/// which runs the provider on the blocking pool under a timeout.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text])?;
        vectors
            .pop()
            .ok_or_else(|| Error::embedding("provider returned no vector for a single input"))
    }

    /// Embed a batch of texts, returning one vector per input in the same order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Number of dimensions this provider produces.
    fn dimensions(&self) -> usize;

    /// Identifier recorded alongside each collection, e.g. `"hash-v1"`.
    fn model_id(&self) -> &str;
}

/// Create an embedding provider from config.
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "hash" => Ok(Arc::new(hash::HashEmbeddingProvider::new(
            &config.model,
            config.dimensions,
        ))),
        "http" => Ok(Arc::new(http::HttpEmbeddingProvider::new(config)?)),
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: hash, http"),
    }
}

/// Embed `texts` with one provider call on the blocking pool, bounded by `timeout`.
///
/// Fails with [`Error::Embedding`] on provider failure, timeout, or when the
/// provider returns a different number of vectors than inputs. No store lock
/// may be held across this call.
pub async fn embed_bounded(
    provider: &Arc<dyn EmbeddingProvider>,
    texts: Vec<String>,
    timeout: Duration,
) -> Result<Vec<Vec<f32>>> {
    let expected = texts.len();
    let provider = Arc::clone(provider);
    let task = tokio::task::spawn_blocking(move || {
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        provider.embed_batch(&refs)
    });

    let vectors = match tokio::time::timeout(timeout, task).await {
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "embedding call timed out");
            return Err(Error::Embedding {
                message: format!("timed out after {}ms", timeout.as_millis()),
                timed_out: true,
            });
        }
        Ok(Err(join_err)) => {
            return Err(Error::embedding(format!("embedding task failed: {join_err}")));
        }
        Ok(Ok(result)) => result.map_err(|e| match e {
            Error::Embedding { .. } => e,
            other => Error::embedding(other.to_string()),
        })?,
    };

    if vectors.len() != expected {
        return Err(Error::embedding(format!(
            "provider returned {} vectors for {expected} inputs",
            vectors.len()
        )));
    }

    Ok(vectors)
}

/// L2-normalize a vector. Returns the input unchanged if its norm is zero.
pub fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}
