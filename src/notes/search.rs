//! Query pipeline: embed the query once, rank through the index, join records.

use std::sync::Arc;

use super::service::{run_blocking, NoteService};
use super::types::SearchHit;
use crate::embedding;
use crate::error::{Error, Result};

impl NoteService {
    /// The `k` notes closest to `query` (default `k` from config), closest first.
    ///
    /// An unknown or empty collection yields an empty result. An indexed id with
    /// no repository record fails with [`Error::Consistency`].
    pub async fn search(
        &self,
        query: &str,
        collection: Option<&str>,
        k: Option<usize>,
    ) -> Result<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Err(Error::validation("query must not be empty"));
        }
        let k = k.unwrap_or(self.default_k);
        if k == 0 {
            return Err(Error::validation("k must be at least 1"));
        }
        let name = self.store.resolve_name(collection)?.to_string();

        let mut vectors =
            embedding::embed_bounded(&self.embedding, vec![query.to_string()], self.embed_timeout)
                .await?;
        let query_embedding = vectors
            .pop()
            .ok_or_else(|| Error::embedding("provider returned no query vector"))?;

        let store = Arc::clone(&self.store);
        let collection_name = name.clone();
        let hits = run_blocking(move || {
            let Some(collection) = store.existing(&collection_name)? else {
                return Ok(Vec::new());
            };
            match collection.nearest(&query_embedding, k) {
                Err(Error::EmptyCollection { .. }) => Ok(Vec::new()),
                other => other,
            }
        })
        .await?;

        tracing::debug!(collection = %name, k, hits = hits.len(), "search completed");
        Ok(hits)
    }
}
