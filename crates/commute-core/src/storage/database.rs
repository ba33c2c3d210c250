//! Key-value persistence for engine history.
//!
//! The engine only needs `get`/`set`/`update` on string keys. `update` is a
//! read-modify-write that must not interleave with another writer of the
//! same key, so several processes can append to one database. Two backends
//! are provided:
//! - [`SqliteStore`]: a `kv` table in `~/.config/commute/commute.db`
//! - [`MemoryStore`]: a `HashMap`, for tests and embedding

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::data_dir;
use crate::error::HistoryError;

/// Durable key-value store consumed by the history, impact and report logs.
pub trait KvStore {
    /// Get a value; `Ok(None)` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>, HistoryError>;

    /// Insert or replace a value.
    fn set(&self, key: &str, value: &str) -> Result<(), HistoryError>;

    /// Replace a value with `apply(current)`. Nothing is written when
    /// `apply` fails.
    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<String>) -> Result<String, HistoryError>,
    ) -> Result<(), HistoryError> {
        let next = apply(self.get(key)?)?;
        self.set(key, &next)
    }
}

/// Apply `change` to the JSON document stored under `key` and return the
/// merged document. A missing or unreadable document starts from `local`.
pub fn update_json<T>(
    store: &dyn KvStore,
    key: &str,
    local: &T,
    mut change: impl FnMut(&mut T),
) -> Result<T, HistoryError>
where
    T: Serialize + DeserializeOwned + Clone,
{
    let mut merged = None;
    store.update(key, &mut |raw| {
        let mut doc = match raw.map(|raw| serde_json::from_str::<T>(&raw)) {
            Some(Ok(doc)) => doc,
            Some(Err(e)) => {
                tracing::warn!(key, error = %e, "replacing unreadable stored document");
                local.clone()
            }
            None => local.clone(),
        };
        change(&mut doc);
        let raw = serde_json::to_string(&doc)?;
        merged = Some(doc);
        Ok(raw)
    })?;
    merged.ok_or_else(|| HistoryError::Unavailable(format!("nothing written under {key}")))
}

/// In-memory store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, HistoryError> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), HistoryError> {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl<S: KvStore + ?Sized> KvStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, HistoryError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), HistoryError> {
        (**self).set(key, value)
    }

    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<String>) -> Result<String, HistoryError>,
    ) -> Result<(), HistoryError> {
        (**self).update(key, apply)
    }
}

/// How long a writer waits for another process's transaction.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed store.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open the database at `~/.config/commute/commute.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened.
    pub fn open() -> Result<Self, HistoryError> {
        let dir = data_dir().map_err(|e| HistoryError::Unavailable(e.to_string()))?;
        Self::open_at(&dir.join("commute.db"))
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, HistoryError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, HistoryError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }
}

impl KvStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, HistoryError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), HistoryError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Runs under `BEGIN IMMEDIATE`, so the read and the write hold the
    /// database write lock together.
    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<String>) -> Result<String, HistoryError>,
    ) -> Result<(), HistoryError> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let current = tx
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        let next = apply(current)?;
        tx.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, next],
        )?;
        tx.commit()?;
        Ok(())
    }
}
