//! Canonical note records for one collection.
//!
//! [`NoteRepository`] owns the collection's SQLite connection. Writes go through
//! [`insert_rows`] and [`delete_rows`], which run inside a caller-provided
//! transaction so the store can keep the similarity index in step before commit.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::{params, Connection, Row, Transaction};

use super::types::{NewNote, Note};
use super::{bytes_to_embedding, embedding_to_bytes};
use crate::db::{self, migrations};
use crate::error::{Error, Result};

pub struct NoteRepository {
    conn: Connection,
    collection: String,
}

impl NoteRepository {
    /// Open (or create) the collection database at `path`.
    pub fn open(path: impl AsRef<Path>, collection: &str) -> Result<Self> {
        Ok(Self {
            conn: db::open_database(path)?,
            collection: collection.to_string(),
        })
    }

    pub fn open_in_memory(collection: &str) -> Result<Self> {
        Ok(Self {
            conn: db::open_memory_database()?,
            collection: collection.to_string(),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Begin a write transaction on this collection.
    pub fn begin(&mut self) -> Result<Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }

    /// The collection's established dimension, `None` before the first insert.
    pub fn dimension(&self) -> Result<Option<usize>> {
        Ok(migrations::get_dimension(&self.conn)?)
    }

    pub fn embedding_model(&self) -> Result<Option<String>> {
        Ok(migrations::get_embedding_model(&self.conn)?)
    }

    pub fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Insert a single note in its own transaction. Returns the stored record.
    pub fn insert(&mut self, title: &str, content: &str, embedding: &[f32]) -> Result<Note> {
        let collection = self.collection.clone();
        let tx = self.begin()?;
        let mut notes = insert_rows(&tx, &collection, &[(NewNote::new(title, content), embedding.to_vec())])?;
        tx.commit()?;
        notes
            .pop()
            .ok_or_else(|| Error::consistency("insert produced no row"))
    }

    /// Every note in insertion order.
    pub fn get_all(&self) -> Result<Vec<Note>> {
        let dimension = self.dimension()?;
        let mut stmt = self.conn.prepare(
            "SELECT id, title, content, embedding, created_at FROM notes ORDER BY seq",
        )?;
        let rows = stmt
            .query_map([], read_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|row| row.into_note(&self.collection, dimension))
            .collect()
    }

    /// Notes for `ids`, in the requested order.
    ///
    /// Fails with [`Error::NotFound`] listing every id that has no record.
    pub fn get_by_ids(&self, ids: &[String]) -> Result<Vec<Note>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let dimension = self.dimension()?;

        let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "SELECT id, title, content, embedding, created_at FROM notes WHERE id IN ({})",
            placeholders.join(", ")
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(ids.iter()), read_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let by_id: HashMap<String, RawNote> =
            rows.into_iter().map(|r| (r.id.clone(), r)).collect();

        let missing: Vec<String> = ids
            .iter()
            .filter(|id| !by_id.contains_key(id.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(Error::NotFound { ids: missing });
        }

        // Preserve input order; a repeated id resolves to the same record each time
        ids.iter()
            .map(|id| {
                let raw = by_id
                    .get(id.as_str())
                    .cloned()
                    .ok_or_else(|| Error::NotFound { ids: vec![id.clone()] })?;
                raw.into_note(&self.collection, dimension)
            })
            .collect()
    }

    /// Checkpoint the WAL into the main database file.
    pub fn checkpoint(&self) -> Result<()> {
        self.conn
            .query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
        Ok(())
    }
}

/// Insert `batch` inside `tx`, in order. Validates non-empty content and the
/// collection dimension; the first insert into a fresh collection fixes it.
///
/// Nothing is visible until the caller commits `tx`.
pub fn insert_rows(
    tx: &Transaction,
    collection: &str,
    batch: &[(NewNote, Vec<f32>)],
) -> Result<Vec<Note>> {
    let mut dimension = migrations::get_dimension(tx)?;
    let mut stored = Vec::with_capacity(batch.len());

    for (note, embedding) in batch {
        if note.content.trim().is_empty() {
            return Err(Error::validation("note content must not be empty"));
        }
        if embedding.is_empty() {
            return Err(Error::validation("embedding must not be empty"));
        }
        match dimension {
            Some(expected) if expected != embedding.len() => {
                return Err(Error::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
            Some(_) => {}
            None => {
                migrations::set_dimension(tx, embedding.len())?;
                dimension = Some(embedding.len());
            }
        }

        let id = uuid::Uuid::now_v7().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        tx.execute(
            "INSERT INTO notes (id, title, content, embedding, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, note.title, note.content, embedding_to_bytes(embedding), now],
        )?;
        write_log(tx, "create", &id, &now)?;

        stored.push(Note {
            id,
            title: note.title.clone(),
            content: note.content.clone(),
            embedding: embedding.clone(),
            collection: collection.to_string(),
            created_at: now,
        });
    }

    Ok(stored)
}

/// Delete `ids` inside `tx`. Fails with [`Error::NotFound`] (deleting nothing)
/// if any id is absent.
pub fn delete_rows(tx: &Transaction, ids: &[String]) -> Result<usize> {
    let mut missing = Vec::new();
    for id in ids {
        let exists: bool = tx.query_row(
            "SELECT COUNT(*) > 0 FROM notes WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        if !exists {
            missing.push(id.clone());
        }
    }
    if !missing.is_empty() {
        return Err(Error::NotFound { ids: missing });
    }

    let now = chrono::Utc::now().to_rfc3339();
    let mut deleted = 0;
    for id in ids {
        deleted += tx.execute("DELETE FROM notes WHERE id = ?1", params![id])?;
        write_log(tx, "delete", id, &now)?;
    }
    Ok(deleted)
}

fn write_log(conn: &Connection, operation: &str, note_id: &str, at: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO note_log (operation, note_id, created_at) VALUES (?1, ?2, ?3)",
        params![operation, note_id, at],
    )?;
    Ok(())
}

#[derive(Clone)]
struct RawNote {
    id: String,
    title: String,
    content: String,
    embedding: Vec<u8>,
    created_at: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawNote> {
    Ok(RawNote {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        embedding: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl RawNote {
    fn into_note(self, collection: &str, dimension: Option<usize>) -> Result<Note> {
        let embedding = bytes_to_embedding(&self.embedding).ok_or_else(|| {
            Error::consistency(format!("note {} has a truncated embedding blob", self.id))
        })?;
        if let Some(expected) = dimension {
            if embedding.len() != expected {
                return Err(Error::consistency(format!(
                    "note {} has a {}-dimensional embedding, collection expects {expected}",
                    self.id,
                    embedding.len()
                )));
            }
        }
        Ok(Note {
            id: self.id,
            title: self.title,
            content: self.content,
            embedding,
            collection: collection.to_string(),
            created_at: self.created_at,
        })
    }
}
