//! SQLite storage implementation.
//!
//! This module provides the metadata store for dropmirror using SQLite.
//! A mirror run executes inside [`MetaStore::run`], which buffers every
//! write in one transaction: the run commits once at clean completion and
//! rolls back entirely on failure.

use crate::error::{Error, Result};
use crate::model::{Credential, MetadataRecord, RecordType};
use crate::storage::schema::apply_schema;
use chrono::NaiveDateTime;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, trace};

const RECORD_COLUMNS: &str =
    "key, type, name, id, size, path, parent, rev, client_ts, server_ts, mod_ts, sync_ts";

/// SQLite-based metadata store.
#[derive(Debug)]
pub struct MetaStore {
    conn: Connection,
}

/// Predicate over stored `meta` columns.
///
/// All set conditions are combined with AND; an empty query matches every
/// record. Results are always ordered by key.
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    key: Option<String>,
    parent: Option<String>,
    under: Option<String>,
    record_type: Option<RecordType>,
    synced_before: Option<NaiveDateTime>,
}

impl RecordQuery {
    /// Match every record.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Match the record stored under `key`.
    #[must_use]
    pub fn key(key: &str) -> Self {
        Self {
            key: Some(key.to_string()),
            ..Self::default()
        }
    }

    /// Match direct children of the folder stored under `parent`.
    #[must_use]
    pub fn children_of(parent: &str) -> Self {
        Self {
            parent: Some(parent.to_string()),
            ..Self::default()
        }
    }

    /// Match everything strictly below `prefix` (by key).
    #[must_use]
    pub fn under(prefix: &str) -> Self {
        Self {
            under: Some(prefix.to_string()),
            ..Self::default()
        }
    }

    /// Restrict to one record type.
    #[must_use]
    pub fn of_type(mut self, record_type: RecordType) -> Self {
        self.record_type = Some(record_type);
        self
    }

    /// Restrict to records not touched since `ts` (never-synced included).
    #[must_use]
    pub fn synced_before(mut self, ts: NaiveDateTime) -> Self {
        self.synced_before = Some(ts);
        self
    }

    /// Build the WHERE clause and its positional parameters.
    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(key) = &self.key {
            params.push(Value::Text(key.clone()));
            conditions.push(format!("key = ?{}", params.len()));
        }
        if let Some(parent) = &self.parent {
            params.push(Value::Text(parent.clone()));
            conditions.push(format!("parent = ?{}", params.len()));
        }
        if let Some(prefix) = &self.under {
            params.push(Value::Text(format!("{prefix}/")));
            let idx = params.len();
            conditions.push(format!("substr(key, 1, length(?{idx})) = ?{idx}"));
        }
        if let Some(record_type) = &self.record_type {
            params.push(Value::Text(record_type.as_str().to_string()));
            params.push(Value::Text(record_type.short_tag().to_string()));
            let idx = params.len();
            conditions.push(format!("type IN (?{}, ?{idx})", idx - 1));
        }
        if let Some(ts) = &self.synced_before {
            params.push(Value::Text(format_ts(ts)));
            conditions.push(format!("(sync_ts IS NULL OR sync_ts < ?{})", params.len()));
        }

        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        (clause, params)
    }
}

/// Same text layout rusqlite uses when binding a `NaiveDateTime`.
fn format_ts(ts: &NaiveDateTime) -> String {
    ts.format("%F %T%.f").to_string()
}

fn map_record(row: &Row<'_>) -> rusqlite::Result<MetadataRecord> {
    let type_tag: String = row.get(1)?;
    let record_type = type_tag.parse::<RecordType>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, e.into())
    })?;

    Ok(MetadataRecord {
        key: row.get(0)?,
        record_type,
        name: row.get(2)?,
        id: row.get(3)?,
        size: row.get(4)?,
        path: row.get(5)?,
        parent: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        rev: row.get(7)?,
        client_modified: row.get(8)?,
        server_modified: row.get(9)?,
        modified_at: row.get(10)?,
        synced_at: row.get(11)?,
    })
}

impl MetaStore {
    /// Open (or create) the metadata file at `path`.
    ///
    /// The parent directory is created if needed. With `reset`, all sync
    /// history is dropped before the store is handed out.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path, reset: bool) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        apply_schema(&conn, reset)?;
        debug!(path = %path.display(), reset, "Opened metadata store");
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn, false)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Execute a whole mirror run inside one transaction.
    ///
    /// Every write made through `self` inside `f` is buffered. The
    /// transaction commits when `f` returns `Ok`; on `Err` (or a panic
    /// unwinding through here) it is dropped, which rolls it back.
    /// Filesystem changes made by `f` are not undone.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or an error if the commit fails.
    pub fn run<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Self) -> Result<R>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let result = f(self)?;
        tx.commit()?;
        Ok(result)
    }

    // ==================
    // Record Operations
    // ==================

    /// Find records matching `query`, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find(&self, query: &RecordQuery) -> Result<Vec<MetadataRecord>> {
        let (clause, params) = query.where_clause();
        let sql = format!("SELECT {RECORD_COLUMNS} FROM meta{clause} ORDER BY key");

        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(rusqlite::params_from_iter(params), map_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Get the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails, or if more than one record
    /// shares the key (which the primary key makes impossible for files
    /// this crate created).
    pub fn get(&self, key: &str) -> Result<Option<MetadataRecord>> {
        let mut found = self.find(&RecordQuery::key(key))?;
        if found.len() > 1 {
            return Err(Error::Other(format!(
                "Metadata store holds {} records for key '{key}'",
                found.len()
            )));
        }
        Ok(found.pop())
    }

    /// Direct children of the folder stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn children(&self, key: &str) -> Result<Vec<MetadataRecord>> {
        self.find(&RecordQuery::children_of(key))
    }

    /// Number of stored records.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM meta", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Insert or replace `record`, returning what was stored.
    ///
    /// `modified_at` advances to `run_ts` only when the record differs from
    /// the stored one (see [`MetadataRecord::same_content`]); otherwise the
    /// previous value is carried over. `synced_at` becomes `run_ts` when
    /// `touch` is set, else the previous value is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup or the write fails.
    pub fn upsert(
        &self,
        record: &MetadataRecord,
        run_ts: NaiveDateTime,
        touch: bool,
    ) -> Result<MetadataRecord> {
        let prev = self.get(&record.key)?;
        let mut stored = record.clone();

        stored.synced_at = if touch {
            Some(run_ts)
        } else {
            prev.as_ref().and_then(|p| p.synced_at)
        };
        stored.modified_at = match &prev {
            Some(p) if p.same_content(record) => p.modified_at.or(Some(run_ts)),
            _ => Some(run_ts),
        };

        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO meta ({RECORD_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
            ),
            rusqlite::params![
                stored.key,
                stored.record_type.as_str(),
                stored.name,
                stored.id,
                stored.size,
                stored.path,
                stored.parent,
                stored.rev,
                stored.client_modified,
                stored.server_modified,
                stored.modified_at,
                stored.synced_at,
            ],
        )?;
        trace!(key = %stored.key, record_type = %stored.record_type, "Upserted record");

        Ok(stored)
    }

    /// Bulk delete every record matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn remove(&self, query: &RecordQuery) -> Result<usize> {
        let (clause, params) = query.where_clause();
        let sql = format!("DELETE FROM meta{clause}");
        let removed = self
            .conn
            .execute(&sql, rusqlite::params_from_iter(params))?;
        Ok(removed)
    }

    /// Delete the record under `key` and, through parent links, its subtree.
    ///
    /// # Errors
    ///
    /// Returns an error if a lookup or delete fails.
    pub fn remove_tree(&self, key: &str) -> Result<usize> {
        let mut removed = 0;
        for child in self.children(key)? {
            removed += self.remove_tree(&child.key)?;
        }
        removed += self.remove(&RecordQuery::key(key))?;
        Ok(removed)
    }

    // ==================
    // Login Operations
    // ==================

    /// The live credential, if any.
    ///
    /// A credential is live when it has no expiry or expires after `now`;
    /// the one expiring last wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn credential(&self, now: NaiveDateTime) -> Result<Option<Credential>> {
        let credential = self
            .conn
            .query_row(
                "SELECT token, expires, refresh_token, account_id, user_id FROM login
                 WHERE expires > ?1 OR expires IS NULL
                 ORDER BY expires DESC LIMIT 1",
                [now],
                |row| {
                    Ok(Credential {
                        token: row.get(0)?,
                        expires: row.get(1)?,
                        refresh_token: row.get(2)?,
                        account_id: row.get(3)?,
                        user_id: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(credential)
    }

    /// Replace the stored login with `credential`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn save_credential(&self, credential: &Credential) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM login", [])?;
        tx.execute(
            "INSERT INTO login (token, expires, refresh_token, account_id, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                credential.token,
                credential.expires,
                credential.refresh_token,
                credential.account_id,
                credential.user_id,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Drop logins that expired at or before `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn purge_expired_credentials(&self, now: NaiveDateTime) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM login WHERE expires <= ?1", [now])?;
        Ok(removed)
    }
}
