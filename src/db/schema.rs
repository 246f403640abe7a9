//! SQL DDL for a collection database.
//!
//! Each collection lives in its own SQLite file with a `notes` table (the
//! canonical record store, embeddings as little-endian `f32` BLOBs), a
//! `note_log` audit table and a `collection_meta` key/value table. All DDL
//! uses `IF NOT EXISTS`.

use rusqlite::Connection;

/// Base schema (version 1).
const SCHEMA_SQL: &str = r#"
-- Canonical note records. `seq` fixes insertion order for index rebuilds.
CREATE TABLE IF NOT EXISTS notes (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    content TEXT NOT NULL CHECK(length(trim(content)) > 0),
    embedding BLOB NOT NULL,
    created_at TEXT NOT NULL
);

-- Audit log of create/delete operations
CREATE TABLE IF NOT EXISTS note_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    operation TEXT NOT NULL CHECK(operation IN ('create','delete')),
    note_id TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_note_log_note ON note_log(note_id);

-- Collection metadata: schema_version, dimension, embedding_model
CREATE TABLE IF NOT EXISTS collection_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO collection_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
