//! Database schema definitions.
//!
//! The metadata file is a two-table SQLite database. Its layout is shared
//! with metadata files written by earlier mirror runs, so columns are never
//! renamed or reordered.

use rusqlite::{Connection, Result};

/// Current schema version, recorded in `PRAGMA user_version`.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// The complete SQL schema for the metadata store.
///
/// Note: Timestamps are stored as TEXT (`YYYY-MM-DD HH:MM:SS[.ffffff]`, UTC)
/// so files written by earlier versions stay readable.
pub const SCHEMA_SQL: &str = r"
-- Per-path sync records, keyed by case-folded path
CREATE TABLE IF NOT EXISTS meta (
    key        TEXT NOT NULL PRIMARY KEY,
    type       TEXT NOT NULL,
    name       TEXT NOT NULL,
    id         TEXT,
    size       INTEGER,
    path       TEXT,
    parent     TEXT,
    rev        TEXT,
    client_ts  TIMESTAMP,
    server_ts  TIMESTAMP,
    mod_ts     TIMESTAMP,
    sync_ts    TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_meta_parent ON meta(parent);

-- Stored login (single active row)
CREATE TABLE IF NOT EXISTS login (
    token         TEXT,
    expires       TIMESTAMP,
    refresh_token TEXT,
    account_id    TEXT,
    user_id       TEXT
);
";

/// Apply the schema to a connection.
///
/// With `reset`, the `meta` table is dropped (and the file vacuumed) first,
/// discarding all sync history but keeping the stored login.
///
/// # Errors
///
/// Returns an error if any statement fails.
pub fn apply_schema(conn: &Connection, reset: bool) -> Result<()> {
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;

    if reset {
        conn.execute_batch("DROP TABLE IF EXISTS meta; VACUUM;")?;
    }

    conn.execute_batch(SCHEMA_SQL)?;
    conn.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)?;

    Ok(())
}
