//! Key-value persistence port for durable client-side state
//!
//! The pipeline persists its "last result" and "last input" records through
//! this small abstraction instead of a concrete storage medium, so tests can
//! substitute an in-memory store for the SQLite-backed one.

use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::Mutex;

/// Logical key for the durable "last result" record
pub const RESULT_KEY: &str = "caricature_result";
/// Logical key for the durable "last input" record
pub const INPUT_KEY: &str = "caricature_input";

/// Errors that can occur in the persistence layer
#[derive(Debug)]
pub enum StoreError {
    Database(rusqlite::Error),
    Other(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Database(e) => write!(f, "Database error: {}", e),
            StoreError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e)
    }
}

/// Persistence port: get/set/delete by logical key.
///
/// All three operations are idempotent. Values are opaque strings; callers
/// serialize their records (JSON) before writing.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store for tests and fallback-only operation
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Other("Store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Other("Store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Other("Store lock poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

/// SQLite-backed store with a single `kv_store` table
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Wraps an open connection and initializes the schema.
    pub fn new(conn: Connection) -> Result<Self, StoreError> {
        init_store_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// Creates the key-value table if it does not exist yet
pub fn init_store_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::Other("Store lock poisoned".to_string()))?;
        let result = conn.query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            [key],
            |row| row.get(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::Other("Store lock poisoned".to_string()))?;
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, CURRENT_TIMESTAMP)
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = CURRENT_TIMESTAMP",
            [key, value],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::Other("Store lock poisoned".to_string()))?;
        conn.execute("DELETE FROM kv_store WHERE key = ?1", [key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_store() -> SqliteStore {
        SqliteStore::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v1").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("v1".to_string()));
        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("v2".to_string()));
        store.delete("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        // Deleting again is a no-op
        store.delete("k").unwrap();
    }

    #[test]
    fn test_sqlite_store_round_trip() {
        let store = sqlite_store();
        assert_eq!(store.get(RESULT_KEY).unwrap(), None);
        store.set(RESULT_KEY, "{\"a\":1}").unwrap();
        assert_eq!(store.get(RESULT_KEY).unwrap(), Some("{\"a\":1}".to_string()));
        store.set(RESULT_KEY, "{\"a\":2}").unwrap();
        assert_eq!(store.get(RESULT_KEY).unwrap(), Some("{\"a\":2}".to_string()));
        store.delete(RESULT_KEY).unwrap();
        assert_eq!(store.get(RESULT_KEY).unwrap(), None);
    }
}
