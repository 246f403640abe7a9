//! Schema version tracking and collection metadata accessors.
//!
//! The schema version lives in `collection_meta` next to the collection's
//! dimension and embedding model id.

use rusqlite::{Connection, OptionalExtension};

use crate::error::{Error, Result};

/// The schema version that the current binary expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Get the current schema version from the database.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let value = get_meta(conn, "schema_version")?;
    Ok(value.and_then(|v| v.parse::<u32>().ok()).unwrap_or(0))
}

/// Read a metadata value, if present.
pub fn get_meta(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM collection_meta WHERE key = ?1",
        [key],
        |row| row.get::<_, String>(0),
    )
    .optional()
}

/// Insert or replace a metadata value.
pub fn set_meta(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO collection_meta (key, value) VALUES (?1, ?2)",
        [key, value],
    )?;
    Ok(())
}

/// The collection's established embedding dimension, fixed by its first insert.
pub fn get_dimension(conn: &Connection) -> rusqlite::Result<Option<usize>> {
    let value = get_meta(conn, "dimension")?;
    Ok(value.and_then(|v| v.parse::<usize>().ok()))
}

pub fn set_dimension(conn: &Connection, dimension: usize) -> rusqlite::Result<()> {
    set_meta(conn, "dimension", &dimension.to_string())
}

/// Get the stored embedding model identifier, if any.
pub fn get_embedding_model(conn: &Connection) -> rusqlite::Result<Option<String>> {
    get_meta(conn, "embedding_model")
}

pub fn set_embedding_model(conn: &Connection, model: &str) -> rusqlite::Result<()> {
    set_meta(conn, "embedding_model", model)
}

/// Check the stored schema version against [`CURRENT_SCHEMA_VERSION`].
///
/// Version 1 is the base schema written by [`init_schema`], so there are no
/// upgrade steps yet. A database written by a newer schema is refused rather
/// than read with the wrong layout.
///
/// [`init_schema`]: crate::db::schema::init_schema
pub fn check_schema_version(conn: &Connection) -> Result<()> {
    let version = get_schema_version(conn)?;
    tracing::debug!(schema_version = version, supported = CURRENT_SCHEMA_VERSION, "checking schema version");

    if version > CURRENT_SCHEMA_VERSION {
        return Err(Error::Io {
            message: format!(
                "collection schema version {version} is newer than the supported version {CURRENT_SCHEMA_VERSION}"
            ),
        });
    }
    if version < CURRENT_SCHEMA_VERSION {
        set_meta(conn, "schema_version", &CURRENT_SCHEMA_VERSION.to_string())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::schema::init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn get_schema_version_returns_1_on_fresh_db() {
        let conn = test_db();
        assert_eq!(get_schema_version(&conn).unwrap(), 1);
    }

    #[test]
    fn base_schema_is_current_and_includes_audit_log() {
        let conn = test_db();
        check_schema_version(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);

        let log_rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM note_log", [], |row| row.get(0))
            .unwrap();
        assert_eq!(log_rows, 0);
    }

    #[test]
    fn missing_version_is_stamped() {
        let conn = test_db();
        conn.execute("DELETE FROM collection_meta WHERE key = 'schema_version'", [])
            .unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), 0);

        check_schema_version(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn newer_schema_is_refused() {
        let conn = test_db();
        set_meta(&conn, "schema_version", "99").unwrap();
        let err = check_schema_version(&conn).unwrap_err();
        assert_eq!(err.kind(), "io_error");
    }

    #[test]
    fn dimension_unset_until_written() {
        let conn = test_db();
        assert_eq!(get_dimension(&conn).unwrap(), None);
        set_dimension(&conn, 384).unwrap();
        assert_eq!(get_dimension(&conn).unwrap(), Some(384));
    }

    #[test]
    fn set_and_get_embedding_model() {
        let conn = test_db();
        assert!(get_embedding_model(&conn).unwrap().is_none());
        set_embedding_model(&conn, "hash-v1").unwrap();
        assert_eq!(get_embedding_model(&conn).unwrap(), Some("hash-v1".to_string()));
    }
}
