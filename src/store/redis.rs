//! Redis Store Module
//!
//! Persists cache entries on a Redis instance over a multiplexed async
//! connection.

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use tracing::info;

use crate::error::StorageError;
use crate::store::CacheStore;

// == Redis Store ==
/// Stores blobs under prefixed keys.
///
/// The multiplexed connection is cheap to clone, so each operation works on
/// its own handle. Writes set the entry TTL natively via `SET .. EX`; the
/// cache's own expiry check stays authoritative. `clear` deletes only keys
/// under this store's prefix, so a shared instance is safe.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
    prefix: String,
}

impl RedisStore {
    // == Constructor ==
    /// Connects to a Redis instance.
    ///
    /// # Arguments
    /// * `url` - Connection URL, e.g. `redis://127.0.0.1:6379`
    /// * `prefix` - Namespace prepended to every storage key
    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, StorageError> {
        let client = Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;

        Ok(Self {
            conn,
            prefix: prefix.into(),
        })
    }

    /// Prefixed storage key for a caller key.
    fn storage_key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn write(&self, key: &str, blob: &[u8], ttl_seconds: u64) -> Result<(), StorageError> {
        let mut conn = self.conn.clone();
        let storage_key = self.storage_key(key);

        if ttl_seconds > 0 {
            let _: () = conn.set_ex(&storage_key, blob, ttl_seconds).await?;
        } else {
            let _: () = conn.set(&storage_key, blob).await?;
        }
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let mut conn = self.conn.clone();
        let blob: Option<Vec<u8>> = conn.get(self.storage_key(key)).await?;
        Ok(blob)
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(self.storage_key(key)).await?;
        Ok(removed > 0)
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let mut conn = self.conn.clone();

        let keys: Vec<String> = conn.keys(format!("{}:*", self.prefix)).await?;
        if keys.is_empty() {
            return Ok(());
        }

        let removed: i64 = conn.del(&keys).await?;
        info!("Cleared {} redis keys under prefix {}", removed, self.prefix);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
