//! SQLite-backed session storage.
//!
//! Opens the database, applies the WAL pragmas and brings the schema up to
//! date, tracked through `PRAGMA user_version`. Every
//! value is scoped to the session id the handle was opened with, so several
//! sessions can share one file without seeing each other's state.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use tokio_rusqlite::{Connection, params, rusqlite};

use super::SessionStorage;
use crate::{AppConfig, Error};

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

/// Schema steps; step `n` moves `user_version` from `n` to `n + 1`.
const SCHEMA: &[&str] = &[include_str!("../../migrations/001_session_items.sql")];

fn upgrade_schema(conn: &rusqlite::Connection) -> Result<(), Error> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    let applied = usize::try_from(version).unwrap_or(0);

    for (step, sql) in SCHEMA.iter().enumerate().skip(applied) {
        let target = step + 1;
        tracing::debug!(version = target, "upgrading session schema");
        conn.execute_batch(sql)
            .map_err(|e| Error::MigrationFailed(format!("schema version {target}: {e}")))?;
        conn.execute_batch(&format!("PRAGMA user_version = {target}"))?;
    }
    Ok(())
}

/// Fixed-width timestamps so `updated_at` compares correctly as text.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Session storage database handle.
///
/// Wraps a tokio-rusqlite Connection that runs statements on a background thread.
#[derive(Clone, Debug)]
pub struct SessionDb {
    conn: Connection,
    session_id: String,
}

impl SessionDb {
    /// Open the database at `path` for `session_id`.
    ///
    /// Creates the file if it doesn't exist, applies pragmas and upgrades the schema.
    pub async fn open(path: impl AsRef<Path>, session_id: impl Into<String>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Storage(e.into()))?;
        Self::init(conn, session_id.into()).await
    }

    /// Open a private in-memory database; its contents end with the process.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Storage(e.into()))?;
        Self::init(conn, "memory".to_string()).await
    }

    /// Open the configured session database, or an in-memory one when no path is set.
    pub async fn from_config(config: &AppConfig, session_id: impl Into<String>) -> Result<Self, Error> {
        match &config.session_db_path {
            Some(path) => Self::open(path, session_id).await,
            None => Self::open_in_memory().await,
        }
    }

    async fn init(conn: Connection, session_id: String) -> Result<Self, Error> {
        conn.call(|conn| -> Result<(), Error> {
            conn.execute_batch(PRAGMAS)?;
            upgrade_schema(conn)
        })
        .await
        .map_err(Error::from)?;

        Ok(Self { conn, session_id })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Delete every session whose newest value is older than `max_age`.
    ///
    /// Returns the number of deleted values.
    pub async fn purge_stale(&self, max_age: Duration) -> Result<u64, Error> {
        let cutoff = timestamp(Utc::now() - max_age);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM session_items WHERE session_id IN (
                        SELECT session_id FROM session_items
                        GROUP BY session_id
                        HAVING MAX(updated_at) < ?1
                    )",
                    params![cutoff],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl SessionStorage for SessionDb {
    async fn get_item(&self, key: &str) -> Result<Option<String>, Error> {
        let session_id = self.session_id.clone();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let mut stmt = conn.prepare("SELECT value FROM session_items WHERE session_id = ?1 AND key = ?2")?;

                let result = stmt.query_row(params![session_id, key], |row| row.get(0));

                match result {
                    Ok(value) => Ok(Some(value)),
                    Err(tokio_rusqlite::rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), Error> {
        let session_id = self.session_id.clone();
        let key = key.to_string();
        let value = value.to_string();
        let updated_at = timestamp(Utc::now());

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO session_items (session_id, key, value, updated_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(session_id, key) DO UPDATE SET
                        value = excluded.value,
                        updated_at = excluded.updated_at",
                    params![session_id, key, value, updated_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn remove_item(&self, key: &str) -> Result<(), Error> {
        let session_id = self.session_id.clone();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "DELETE FROM session_items WHERE session_id = ?1 AND key = ?2",
                    params![session_id, key],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn clear(&self) -> Result<(), Error> {
        let session_id = self.session_id.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("DELETE FROM session_items WHERE session_id = ?1", params![session_id])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let db = SessionDb::open_in_memory().await.unwrap();
        assert!(db.get_item("scroll_position_fyp").await.unwrap().is_none());

        db.set_item("scroll_position_fyp", "120").await.unwrap();
        db.set_item("scroll_position_fyp", "480").await.unwrap();
        assert_eq!(db.get_item("scroll_position_fyp").await.unwrap().as_deref(), Some("480"));
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let db = SessionDb::open_in_memory().await.unwrap();
        db.set_item("a", "1").await.unwrap();
        db.set_item("b", "2").await.unwrap();

        db.remove_item("a").await.unwrap();
        assert!(db.get_item("a").await.unwrap().is_none());
        assert!(db.get_item("b").await.unwrap().is_some());

        db.clear().await.unwrap();
        assert!(db.get_item("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_from_config_without_path_is_in_memory() {
        let db = SessionDb::from_config(&AppConfig::default(), "ignored").await.unwrap();
        assert_eq!(db.session_id(), "memory");
    }

    #[tokio::test]
    async fn test_schema_upgrade_is_idempotent() {
        let db = SessionDb::open_in_memory().await.unwrap();
        let version: i64 = db
            .conn
            .call(|conn| -> Result<i64, Error> {
                upgrade_schema(conn)?;
                Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
            })
            .await
            .unwrap();
        assert_eq!(version, SCHEMA.len() as i64);

        db.set_item("k", "v").await.unwrap();
        assert_eq!(db.get_item("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_purge_stale_sessions() {
        let db = SessionDb::open_in_memory().await.unwrap();
        db.set_item("search_last_tab", "people").await.unwrap();

        assert_eq!(db.purge_stale(Duration::hours(1)).await.unwrap(), 0);

        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
        assert_eq!(db.purge_stale(Duration::milliseconds(1)).await.unwrap(), 1);
        assert!(db.get_item("search_last_tab").await.unwrap().is_none());
    }
}
