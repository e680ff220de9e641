//! Local SQLite-backed record store.
//!
//! Every record is one row in a `records` table, keyed by name, with the
//! value stored as JSON text.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::Value;

use crate::domain::{AppError, Result};

use super::record_store::RecordStore;

/// Record store persisted in a local SQLite file.
///
/// Queries run on the blocking thread pool; the connection is shared
/// behind a mutex.
pub struct LocalStorage {
    conn: Arc<Mutex<Connection>>,
}

impl LocalStorage {
    /// Opens or creates the record store database.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or schema creation fails.
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create storage directory", e))?;
        }

        let conn = Connection::open(path).map_err(AppError::storage)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(AppError::storage)?;

        Self::with_connection(conn)
    }

    /// Opens a throwaway in-memory store.
    ///
    /// # Errors
    /// Returns error if schema creation fails.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(AppError::storage)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS records (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            ",
        )
        .map_err(AppError::storage)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `op` against the connection on the blocking pool.
    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| AppError::Storage {
                message: "Record store connection lock poisoned".into(),
                source: None,
            })?;
            op(&mut conn)
        })
        .await
        .map_err(|e| AppError::Storage {
            message: format!("Storage task failed: {e}"),
            source: Some(Box::new(e)),
        })?
    }
}

#[async_trait]
impl RecordStore for LocalStorage {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>> {
        let keys: Vec<String> = keys.iter().map(ToString::to_string).collect();

        self.run(move |conn| {
            let mut stmt = conn
                .prepare_cached("SELECT value FROM records WHERE key = ?1")
                .map_err(AppError::storage)?;

            let mut found = HashMap::new();
            for key in keys {
                let mut rows = stmt.query([&key]).map_err(AppError::storage)?;
                if let Some(row) = rows.next().map_err(AppError::storage)? {
                    let raw: String = row.get(0).map_err(AppError::storage)?;
                    let value = serde_json::from_str(&raw)
                        .map_err(|e| AppError::corrupt_record(&key, e))?;
                    found.insert(key, value);
                }
            }

            Ok(found)
        })
        .await
    }

    async fn set(&self, entries: HashMap<String, Value>) -> Result<()> {
        let count = entries.len();

        self.run(move |conn| {
            let tx = conn.transaction().map_err(AppError::storage)?;
            {
                let mut stmt = tx
                    .prepare_cached(
                        r"
                    INSERT INTO records (key, value) VALUES (?1, ?2)
                    ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        updated_at = datetime('now')
                    ",
                    )
                    .map_err(AppError::storage)?;

                for (key, value) in &entries {
                    stmt.execute(params![key, value.to_string()])
                        .map_err(AppError::storage)?;
                }
            }
            tx.commit().map_err(AppError::storage)
        })
        .await?;

        tracing::trace!(keys = count, "Records written");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.run(move |conn| {
            conn.execute("DELETE FROM records WHERE key = ?1", [&key])
                .map_err(AppError::storage)?;
            Ok(())
        })
        .await
    }
}
