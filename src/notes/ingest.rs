//! Ingestion pipeline: validate → embed (one bounded call) → write through.
//!
//! A batch is all-or-nothing. Validation and embedding happen before any lock
//! is taken; the write itself is a single [`Collection::insert_batch`] call.
//!
//! [`Collection::insert_batch`]: super::store::Collection::insert_batch

use std::sync::Arc;

use serde_json::Value;

use super::service::{run_blocking, NoteService};
use super::types::NewNote;
use crate::embedding;
use crate::error::{Error, Result};

/// Parse an untyped JSON batch: an array of objects, each with a non-empty
/// string `content` and an optional string `title`.
pub fn parse_batch(value: &Value) -> Result<Vec<NewNote>> {
    let items = value
        .as_array()
        .ok_or_else(|| Error::validation("batch must be a JSON array of notes"))?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let obj = item
                .as_object()
                .ok_or_else(|| Error::validation(format!("note {i} is not an object")))?;
            let content = match obj.get("content") {
                Some(Value::String(s)) => s.clone(),
                Some(_) => {
                    return Err(Error::validation(format!("note {i}: content must be a string")))
                }
                None => return Err(Error::validation(format!("note {i}: missing content"))),
            };
            let title = match obj.get("title") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(_) => {
                    return Err(Error::validation(format!("note {i}: title must be a string")))
                }
            };
            Ok(NewNote { title, content })
        })
        .collect::<Result<Vec<_>>>()
        .and_then(|notes| {
            validate_batch(&notes)?;
            Ok(notes)
        })
}

/// Reject the whole batch if any note has empty content.
pub fn validate_batch(notes: &[NewNote]) -> Result<()> {
    if let Some(i) = notes.iter().position(|n| n.content.trim().is_empty()) {
        return Err(Error::validation(format!("note {i}: content must not be empty")));
    }
    Ok(())
}

impl NoteService {
    /// Ingest `batch` into `collection`. Returns the assigned ids in batch order.
    pub async fn ingest(&self, batch: Vec<NewNote>, collection: Option<&str>) -> Result<Vec<String>> {
        let name = self.store.resolve_name(collection)?.to_string();
        validate_batch(&batch)?;
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = batch.iter().map(|n| n.content.clone()).collect();
        let vectors = embedding::embed_bounded(&self.embedding, texts, self.embed_timeout).await?;

        let rows: Vec<(NewNote, Vec<f32>)> = batch.into_iter().zip(vectors).collect();
        let count = rows.len();
        let model = self.embedding.model_id().to_string();
        let store = Arc::clone(&self.store);
        let collection_name = name.clone();

        let stored = run_blocking(move || {
            let collection = store.collection(&collection_name)?;
            collection.insert_batch(&rows, Some(&model))
        })
        .await?;

        tracing::info!(collection = %name, count, "batch ingested");
        Ok(stored.into_iter().map(|n| n.id).collect())
    }

    /// [`parse_batch`] then [`NoteService::ingest`].
    pub async fn ingest_json(&self, value: &Value, collection: Option<&str>) -> Result<Vec<String>> {
        let batch = parse_batch(value)?;
        self.ingest(batch, collection).await
    }
}
