//! Note record and request/response types.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A stored note, matching a row of the collection's `notes` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// UUID v7 assigned at insert time.
    pub id: String,
    /// Metadata label; never embedded.
    pub title: String,
    /// The embedded, searchable text.
    pub content: String,
    pub embedding: Vec<f32>,
    pub collection: String,
    /// RFC 3339 insert timestamp.
    pub created_at: String,
}

/// A note submitted for ingestion, before an id or embedding exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNote {
    #[serde(default)]
    pub title: String,
    pub content: String,
}

impl NewNote {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// One ranked search result. `score` is the cosine distance to the query
/// (lower is closer).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub content: String,
    pub score: f32,
}

/// Per-collection summary.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionStats {
    pub name: String,
    pub notes: usize,
    pub dimension: Option<usize>,
    pub embedding_model: Option<String>,
}

/// Collection names become file names, so they are limited to `[a-z0-9_-]{1,64}`.
/// Upper case is refused: on a case-insensitive filesystem `Notes` and `notes`
/// would share one file but get two indexes.
pub fn validate_collection_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 64 {
        return Err(Error::validation(format!(
            "collection name must be 1-64 characters, got {}",
            name.len()
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
    {
        return Err(Error::validation(format!(
            "collection name '{name}' may only contain lowercase letters, digits, '_' and '-'"
        )));
    }
    Ok(())
}
