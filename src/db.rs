//! # Persisted State
//!
//! Small key/value store for session credentials. The music-service session
//! only sees the [`TokenStore`] trait, so tests and `--no-persist` runs can
//! swap the `SQLite` store for [`MemoryTokenStore`].

use crate::error::ContextError;
use anyhow::{Context, Result};
use log::{debug, trace};
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Storage key of the music-service access token.
pub const ACCESS_TOKEN_KEY: &str = "spotify_access_token";

/// Key/value persistence used by the session.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ContextError>;
    fn set(&self, key: &str, value: &str) -> Result<(), ContextError>;
    fn clear(&self, key: &str) -> Result<(), ContextError>;
}

/// `SQLite`-backed store. One row per key, upserted on write.
#[derive(Debug)]
pub struct SqliteTokenStore {
    conn: Mutex<Connection>,
}

impl SqliteTokenStore {
    /// Open (or create) the database at `path` and make sure the `tokens`
    /// table exists.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open state database at {}", path.display()))?;
        Self::init(conn)
            .with_context(|| format!("Failed to initialize state database at {}", path.display()))
    }

    /// Store in the platform data directory (`state.db`).
    pub fn open_default() -> Result<Self> {
        let path = crate::config::get_db_path()?;
        Self::open(&path)
    }

    /// Throwaway in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS tokens (
                key        TEXT    PRIMARY KEY,
                value      TEXT    NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )
        .context("Invalid SQL when creating the tokens table")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, ContextError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| ContextError::Storage("state database lock poisoned".to_string()))?;
        Ok(f(&conn)?)
    }
}

impl TokenStore for SqliteTokenStore {
    fn get(&self, key: &str) -> Result<Option<String>, ContextError> {
        trace!("Reading '{key}' from state database");
        self.with_conn(|conn| {
            conn.query_row("SELECT value FROM tokens WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ContextError> {
        let now = chrono::Utc::now().timestamp();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tokens (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                (key, value, now),
            )
        })?;
        debug!("Stored '{key}'");
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), ContextError> {
        self.with_conn(|conn| conn.execute("DELETE FROM tokens WHERE key = ?1", [key]))?;
        debug!("Cleared '{key}'");
        Ok(())
    }
}

/// Process-local store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, ContextError> {
        self.values
            .lock()
            .map_err(|_| ContextError::Storage("token map lock poisoned".to_string()))
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Result<Option<String>, ContextError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ContextError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), ContextError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

impl<T: TokenStore + ?Sized> TokenStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, ContextError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ContextError> {
        (**self).set(key, value)
    }

    fn clear(&self, key: &str) -> Result<(), ContextError> {
        (**self).clear(key)
    }
}

impl<T: TokenStore + ?Sized> TokenStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, ContextError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ContextError> {
        (**self).set(key, value)
    }

    fn clear(&self, key: &str) -> Result<(), ContextError> {
        (**self).clear(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &dyn TokenStore) {
        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap(), None);

        store.set(ACCESS_TOKEN_KEY, "first").unwrap();
        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("first"));

        store.set(ACCESS_TOKEN_KEY, "second").unwrap();
        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("second"));

        store.clear(ACCESS_TOKEN_KEY).unwrap();
        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap(), None);

        // clearing a missing key is fine
        store.clear("never-set").unwrap();
    }

    #[test]
    fn test_memory_store_roundtrip() {
        exercise(&MemoryTokenStore::new());
    }

    #[test]
    fn test_sqlite_store_in_memory() {
        exercise(&SqliteTokenStore::open_in_memory().unwrap());
    }

    #[test]
    fn test_sqlite_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.db");

        {
            let store = SqliteTokenStore::open(&path).unwrap();
            store.set(ACCESS_TOKEN_KEY, "kept").unwrap();
        }

        let reopened = SqliteTokenStore::open(&path).unwrap();
        assert_eq!(reopened.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("kept"));
    }

    #[test]
    fn test_upsert_keeps_single_row() {
        let store = SqliteTokenStore::open_in_memory().unwrap();
        store.set("k", "a").unwrap();
        store.set("k", "b").unwrap();

        let rows: i64 = store
            .with_conn(|conn| conn.query_row("SELECT COUNT(*) FROM tokens", [], |row| row.get(0)))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_open_in_missing_directory_fails() {
        let result = SqliteTokenStore::open(Path::new("/definitely/not/here/state.db"));
        assert!(result.is_err());
    }
}
