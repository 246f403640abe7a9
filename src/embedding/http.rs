//! OpenAI-compatible HTTP embedding provider.
//!
//! Posts `{"model", "input", "dimensions"}` to `{api_base}/embeddings` and reads
//! the `data[].embedding` arrays back in `index` order.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use super::EmbeddingProvider;
use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

pub struct HttpEmbeddingProvider {
    client: Client,
    url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl HttpEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        anyhow::ensure!(
            !config.api_base.is_empty(),
            "embedding.api_base must be set for the http provider"
        );
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            url: format!("{}/embeddings", config.api_base.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }

    async fn request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
            "dimensions": self.dimensions,
        });

        let mut request = self.client.post(&self.url).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await.map_err(|e| Error::Embedding {
            message: format!("request to {} failed: {e}", self.url),
            timed_out: e.is_timeout(),
        })?;
        let response = response
            .error_for_status()
            .map_err(|e| Error::embedding(format!("provider returned error status: {e}")))?;
        let json: Value = response
            .json()
            .await
            .map_err(|e| Error::embedding(format!("invalid provider response: {e}")))?;

        let vectors = parse_embedding_response(json)?;
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimensions) {
            return Err(Error::embedding(format!(
                "provider returned a {}-dimensional vector, configured for {}",
                bad.len(),
                self.dimensions
            )));
        }
        Ok(vectors)
    }
}

impl EmbeddingProvider for HttpEmbeddingProvider {
    /// Must be called from a blocking-pool thread of a tokio runtime
    /// (as [`super::embed_bounded`] does).
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| Error::embedding("http provider called outside a tokio runtime"))?;
        handle.block_on(self.request(texts))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|v| v.as_array())
        .ok_or_else(|| Error::embedding("embedding response is missing data array"))?;

    let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());
    for (fallback_index, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(fallback_index);
        let embedding = item
            .get("embedding")
            .and_then(|v| v.as_array())
            .ok_or_else(|| Error::embedding("embedding item missing embedding array"))?;
        let vector = embedding
            .iter()
            .map(|value| {
                value
                    .as_f64()
                    .map(|n| n as f32)
                    .ok_or_else(|| Error::embedding("embedding value must be numeric"))
            })
            .collect::<Result<Vec<f32>>>()?;
        indexed.push((index, vector));
    }

    // indices must be exactly 0..n, or vectors would pair with the wrong inputs
    let mut seen = vec![false; indexed.len()];
    for (index, _) in &indexed {
        match seen.get_mut(*index) {
            Some(slot) if !*slot => *slot = true,
            Some(_) => {
                return Err(Error::embedding(format!(
                    "embedding response repeats index {index}"
                )))
            }
            None => {
                return Err(Error::embedding(format!(
                    "embedding response index {index} is out of range for {} items",
                    indexed.len()
                )))
            }
        }
    }

    indexed.sort_by_key(|(index, _)| *index);

    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_embeddings_in_index_order() {
        let json = serde_json::json!({
            "data": [
                { "index": 1, "embedding": [2.0, 3.0] },
                { "index": 0, "embedding": [0.5, 1.5] }
            ]
        });
        let parsed = parse_embedding_response(json).unwrap();
        assert_eq!(parsed, vec![vec![0.5, 1.5], vec![2.0, 3.0]]);
    }

    #[test]
    fn duplicate_index_rejected() {
        let json = serde_json::json!({
            "data": [
                { "index": 0, "embedding": [1.0] },
                { "index": 0, "embedding": [2.0] }
            ]
        });
        let err = parse_embedding_response(json).unwrap_err();
        assert_eq!(err.kind(), "embedding_error");
    }

    #[test]
    fn out_of_range_index_rejected() {
        let json = serde_json::json!({
            "data": [
                { "index": 0, "embedding": [1.0] },
                { "index": 2, "embedding": [2.0] }
            ]
        });
        let err = parse_embedding_response(json).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn missing_data_is_embedding_error() {
        let err = parse_embedding_response(serde_json::json!({"error": "bad key"})).unwrap_err();
        assert_eq!(err.kind(), "embedding_error");
    }

    #[test]
    fn non_numeric_values_rejected() {
        let json = serde_json::json!({ "data": [{ "embedding": [1.0, "x"] }] });
        assert!(parse_embedding_response(json).is_err());
    }

    #[test]
    fn embed_outside_runtime_fails_cleanly() {
        let provider = HttpEmbeddingProvider::new(&EmbeddingConfig {
            provider: "http".into(),
            ..Default::default()
        })
        .unwrap();
        let err = provider.embed("hello").unwrap_err();
        assert_eq!(err.kind(), "embedding_error");
    }

    #[tokio::test]
    #[ignore] // Requires a reachable endpoint and QUILL_EMBEDDING_API_KEY
    async fn live_endpoint_returns_configured_dimensions() {
        let config = EmbeddingConfig {
            provider: "http".into(),
            model: "text-embedding-3-small".into(),
            dimensions: 256,
            api_key: std::env::var("QUILL_EMBEDDING_API_KEY").unwrap_or_default(),
            ..Default::default()
        };
        let provider: std::sync::Arc<dyn EmbeddingProvider> =
            std::sync::Arc::new(HttpEmbeddingProvider::new(&config).unwrap());
        let vectors = super::super::embed_bounded(
            &provider,
            vec!["hello world".into()],
            Duration::from_secs(30),
        )
        .await
        .unwrap();
        assert_eq!(vectors[0].len(), 256);
    }
}
