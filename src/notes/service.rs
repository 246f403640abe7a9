//! [`NoteService`]: the store plus the embedding provider, shared by every front end.
//!
//! The ingestion and query pipelines are implemented in [`super::ingest`] and
//! [`super::search`]; this module holds the plain read/delete operations.

use std::sync::Arc;
use std::time::Duration;

use super::store::NoteStore;
use super::types::{CollectionStats, Note};
use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};

#[derive(Clone)]
pub struct NoteService {
    pub(crate) store: Arc<NoteStore>,
    pub(crate) embedding: Arc<dyn EmbeddingProvider>,
    pub(crate) embed_timeout: Duration,
    pub(crate) default_k: usize,
}

impl NoteService {
    pub fn new(
        store: Arc<NoteStore>,
        embedding: Arc<dyn EmbeddingProvider>,
        embed_timeout: Duration,
        default_k: usize,
    ) -> Self {
        Self {
            store,
            embedding,
            embed_timeout,
            default_k,
        }
    }

    pub fn store(&self) -> &Arc<NoteStore> {
        &self.store
    }

    pub fn default_k(&self) -> usize {
        self.default_k
    }

    /// Every note in `collection`, in insertion order. An unknown collection is empty.
    pub async fn list(&self, collection: Option<&str>) -> Result<Vec<Note>> {
        let name = self.store.resolve_name(collection)?.to_string();
        let store = Arc::clone(&self.store);
        run_blocking(move || match store.existing(&name)? {
            Some(collection) => collection.list(),
            None => Ok(Vec::new()),
        })
        .await
    }

    /// Delete notes by id from repository and index together.
    pub async fn delete(&self, ids: Vec<String>, collection: Option<&str>) -> Result<usize> {
        let name = self.store.resolve_name(collection)?.to_string();
        if ids.is_empty() {
            return Err(Error::validation("no ids given"));
        }
        let store = Arc::clone(&self.store);
        let deleted = run_blocking(move || match store.existing(&name)? {
            Some(collection) => collection.delete(&ids),
            None => Err(Error::NotFound { ids }),
        })
        .await?;
        tracing::info!(deleted, "notes deleted");
        Ok(deleted)
    }

    /// Summary of every open collection.
    pub async fn collections(&self) -> Result<Vec<CollectionStats>> {
        let store = Arc::clone(&self.store);
        run_blocking(move || {
            store
                .collection_names()?
                .iter()
                .filter_map(|name| store.existing(name).transpose())
                .map(|collection| collection?.stats())
                .collect()
        })
        .await
    }
}

/// Run synchronous store work on the blocking pool.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| Error::Io {
        message: format!("store task failed: {e}"),
    })?
}
