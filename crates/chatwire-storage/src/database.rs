// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use chatwire_core::ChatwireError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

/// Convert a tokio-rusqlite (or closure) error into `ChatwireError::Storage`.
pub(crate) fn map_tr_err<E: std::fmt::Display>(e: E) -> ChatwireError {
    ChatwireError::Storage {
        source: e.to_string().into(),
    }
}

/// Timestamps are stored as fixed-width RFC 3339 strings so they sort lexically.
pub(crate) fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Read a timestamp column written by [`format_ts`].
pub(crate) fn ts_col(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

/// Read a JSON-encoded column.
pub(crate) fn json_col<T: DeserializeOwned>(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_err(idx, e))
}

pub(crate) fn conversion_err<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String, ChatwireError> {
    serde_json::to_string(value).map_err(|e| ChatwireError::Storage {
        source: Box::new(e),
    })
}

/// Handle to the Chatwire SQLite database.
///
/// Wraps the single `tokio_rusqlite::Connection` every query goes through.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs and run migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, ChatwireError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| ChatwireError::Storage {
                    source: Box::new(e),
                })?;
            }
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(map_tr_err)?;
        let db = Self { conn };
        db.prepare(wal_mode).await?;
        info!(path, wal_mode, "database opened");
        Ok(db)
    }

    /// Open a private in-memory database with the full schema.
    pub async fn open_in_memory() -> Result<Self, ChatwireError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(map_tr_err)?;
        let db = Self { conn };
        db.prepare(false).await?;
        Ok(db)
    }

    async fn prepare(&self, wal_mode: bool) -> Result<(), ChatwireError> {
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                if wal_mode {
                    conn.pragma_update(None, "journal_mode", "WAL")?;
                    conn.pragma_update(None, "synchronous", "NORMAL")?;
                }
                conn.pragma_update(None, "foreign_keys", "ON")?;
                conn.busy_timeout(std::time::Duration::from_secs(5))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        self.conn
            .call(|conn| crate::migrations::run_migrations(conn))
            .await
            .map_err(map_tr_err)?;
        debug!("migrations applied");
        Ok(())
    }

    /// The underlying async connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL so the main database file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), ChatwireError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Checkpoint and close the connection.
    pub async fn close(self) -> Result<(), ChatwireError> {
        self.checkpoint().await?;
        self.conn.close().await.map_err(map_tr_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_creates_parent_dirs_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chatwire.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();
        assert!(path.exists());

        let tables: Vec<String> = db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .unwrap();
        for expected in [
            "channel_bindings",
            "chatbots",
            "conversations",
            "inbound_receipts",
            "messages",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing table {expected}");
        }
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopening_does_not_rerun_migrations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("again.db");
        let path = path.to_str().unwrap();
        Database::open(path, true).await.unwrap().close().await.unwrap();
        Database::open(path, true).await.unwrap().close().await.unwrap();
    }

    #[test]
    fn timestamps_sort_lexically() {
        let early = DateTime::parse_from_rfc3339("2026-01-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let late = early + chrono::Duration::milliseconds(1);
        assert!(format_ts(&early) < format_ts(&late));
        assert_eq!(format_ts(&early).len(), format_ts(&late).len());
    }
}
