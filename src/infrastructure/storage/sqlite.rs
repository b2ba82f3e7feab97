//! SQLite storage implementation

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

use crate::application::errors::StorageError;
use crate::domain::traits::Store;

/// Durable store backed by an embedded SQLite database
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS store (
                channel_id TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (channel_id, key)
            )",
            [],
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(f(&conn)?)
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn get(&self, channel_id: &str, key: &str) -> Result<Option<String>, StorageError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM store WHERE channel_id = ?1 AND key = ?2",
                params![channel_id, key],
                |row| row.get(0),
            )
            .optional()
        })
    }

    async fn set(&self, channel_id: &str, key: &str, value: &str) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO store (channel_id, key, value, updated_at)
                 VALUES (?1, ?2, ?3, datetime('now'))",
                params![channel_id, key, value],
            )
        })?;
        Ok(())
    }

    async fn delete(&self, channel_id: &str, key: &str) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM store WHERE channel_id = ?1 AND key = ?2",
                params![channel_id, key],
            )
        })?;
        Ok(())
    }

    async fn clear(&self, channel_id: &str) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM store WHERE channel_id = ?1", [channel_id])
        })?;
        Ok(())
    }
}
