pub mod migrations;
pub mod schema;

use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Open (or create) a collection database at the given path, apply the schema
/// and check its version.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::Io {
            message: format!("failed to create directory {}: {e}", parent.display()),
        })?;
    }

    let conn = Connection::open(path).map_err(|e| Error::Io {
        message: format!("failed to open database at {}: {e}", path.display()),
    })?;

    // WAL for concurrent readers; FULL sync so a committed insert survives power loss
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "FULL")?;
    conn.busy_timeout(Duration::from_millis(5000))?;

    schema::init_schema(&conn)?;
    migrations::check_schema_version(&conn)?;

    tracing::debug!(path = %path.display(), "collection database opened");
    Ok(conn)
}

/// Open an in-memory database with the schema applied.
pub fn open_memory_database() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    schema::init_schema(&conn)?;
    migrations::check_schema_version(&conn)?;
    Ok(conn)
}

/// Result of [`check_database_health`].
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub integrity_ok: bool,
    pub integrity_details: String,
    pub schema_version: u32,
    pub note_count: i64,
    pub log_count: i64,
    pub dimension: Option<usize>,
    pub embedding_model: Option<String>,
    /// Notes whose stored embedding length disagrees with the collection dimension.
    pub malformed_embeddings: i64,
}

/// Run `PRAGMA integrity_check` and gather row counts and metadata.
pub fn check_database_health(conn: &Connection) -> Result<HealthReport> {
    let integrity_details: String =
        conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
    let schema_version = migrations::get_schema_version(conn)?;
    let note_count: i64 = conn.query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;
    let log_count: i64 = conn.query_row("SELECT COUNT(*) FROM note_log", [], |row| row.get(0))?;
    let dimension = migrations::get_dimension(conn)?;
    let embedding_model = migrations::get_embedding_model(conn)?;

    let malformed_embeddings = match dimension {
        Some(dim) => conn.query_row(
            "SELECT COUNT(*) FROM notes WHERE length(embedding) != ?1",
            [(dim * 4) as i64],
            |row| row.get(0),
        )?,
        None => note_count,
    };

    Ok(HealthReport {
        integrity_ok: integrity_details == "ok",
        integrity_details,
        schema_version,
        note_count,
        log_count,
        dimension,
        embedding_model,
        malformed_embeddings,
    })
}
