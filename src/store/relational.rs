//! Relational Store Module
//!
//! Persists cache entries as rows of a dedicated SQLite `cache` table.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use crate::cache::current_timestamp_secs;
use crate::error::StorageError;
use crate::store::CacheStore;

/// Schema for the dedicated cache table. `cache_key` is unique so each key
/// maps to exactly one row; unrelated tables in the same database are never
/// touched.
const CACHE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS cache (
    cache_key  TEXT    NOT NULL UNIQUE,
    cache_data BLOB    NOT NULL,
    timestamp  INTEGER NOT NULL,
    ttl        INTEGER NOT NULL
)";

// == Relational Store ==
/// One row per key in a dedicated `cache` table.
///
/// `write` is delete-then-insert inside a transaction rather than an upsert,
/// which keeps the semantics obvious and always refreshes `timestamp`. The
/// synchronous `rusqlite` connection is shared behind a mutex and driven from
/// `spawn_blocking` so cache calls never stall the async runtime.
#[derive(Clone)]
pub struct RelationalStore {
    conn: Arc<Mutex<Connection>>,
}

impl RelationalStore {
    // == Constructors ==
    /// Opens (or creates) a file-backed database and ensures the cache table
    /// exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        Self::init_connection(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory database, mainly for tests.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_connection(conn: &Connection) -> Result<(), StorageError> {
        // WAL improves concurrent readers on file-backed DBs (no-op in memory)
        let _ = conn.execute_batch("PRAGMA journal_mode = WAL");
        conn.execute_batch(CACHE_SCHEMA)?;
        Ok(())
    }

    /// Runs `op` against the shared connection on the blocking pool.
    async fn with_conn<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().unwrap();
            op(&mut conn)
        })
        .await
        .map_err(|e| StorageError::TaskJoin(e.to_string()))?
    }
}

#[async_trait]
impl CacheStore for RelationalStore {
    async fn write(&self, key: &str, blob: &[u8], ttl_seconds: u64) -> Result<(), StorageError> {
        let key = key.to_string();
        let blob = blob.to_vec();

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM cache WHERE cache_key = ?1", params![key])?;
            tx.execute(
                "INSERT INTO cache (cache_key, cache_data, timestamp, ttl) VALUES (?1, ?2, ?3, ?4)",
                params![key, blob, current_timestamp_secs() as i64, ttl_seconds as i64],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let key = key.to_string();

        self.with_conn(move |conn| {
            let blob = conn
                .query_row(
                    "SELECT cache_data FROM cache WHERE cache_key = ?1",
                    params![key],
                    |row| row.get::<_, Vec<u8>>(0),
                )
                .optional()?;
            Ok(blob)
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let key = key.to_string();

        self.with_conn(move |conn| {
            let removed = conn.execute("DELETE FROM cache WHERE cache_key = ?1", params![key])?;
            Ok(removed > 0)
        })
        .await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let removed = self
            .with_conn(|conn| Ok(conn.execute("DELETE FROM cache", [])?))
            .await?;
        info!("Cleared {} rows from the cache table", removed);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "relational"
    }
}
