//! Memcached Store Module
//!
//! Persists cache entries on a memcached instance through the synchronous
//! `memcache` client, bridged onto the blocking pool.

use async_trait::async_trait;
use tracing::info;

use crate::crypto::provider::digest_hex;
use crate::error::StorageError;
use crate::store::CacheStore;

/// Above this, memcached reinterprets an expiry as an absolute Unix
/// timestamp (30 days, per the protocol).
const MAX_RELATIVE_EXPIRY: u64 = 2_592_000;

// == Memcached Store ==
/// Stores blobs under hashed, prefixed keys.
///
/// Caller keys are digested to hex before use so arbitrary keys fit
/// memcached's 250-byte, no-whitespace key rules. The entry TTL is also set
/// natively on the server; the cache's own expiry check stays authoritative
/// either way. `clear` flushes the instance, which assumes the instance is
/// dedicated to this cache.
#[derive(Clone)]
pub struct MemcachedStore {
    client: memcache::Client,
    prefix: String,
}

impl MemcachedStore {
    // == Constructor ==
    /// Connects to a memcached instance.
    ///
    /// # Arguments
    /// * `url` - Connection URL, e.g. `memcache://127.0.0.1:11211`
    /// * `prefix` - Namespace prepended to every storage key
    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, StorageError> {
        let url = url.to_string();
        let client = tokio::task::spawn_blocking(move || memcache::Client::connect(url))
            .await
            .map_err(|e| StorageError::TaskJoin(e.to_string()))??;

        Ok(Self {
            client,
            prefix: prefix.into(),
        })
    }

    /// Prefixed, hashed storage key for a caller key.
    fn storage_key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, digest_hex(key.as_bytes()))
    }

    /// Converts the entry TTL to a safe native expiry value.
    ///
    /// Zero (never expire) is passed for TTLs past the protocol's relative
    /// threshold, which memcached would otherwise read as an absolute
    /// timestamp in the past.
    fn native_expiry(ttl_seconds: u64) -> u32 {
        if ttl_seconds == 0 || ttl_seconds > MAX_RELATIVE_EXPIRY {
            0
        } else {
            ttl_seconds as u32
        }
    }

    /// Runs `op` against a clone of the client on the blocking pool.
    async fn with_client<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(memcache::Client) -> Result<T, memcache::MemcacheError> + Send + 'static,
    {
        let client = self.client.clone();
        tokio::task::spawn_blocking(move || op(client))
            .await
            .map_err(|e| StorageError::TaskJoin(e.to_string()))?
            .map_err(StorageError::Memcached)
    }
}

#[async_trait]
impl CacheStore for MemcachedStore {
    async fn write(&self, key: &str, blob: &[u8], ttl_seconds: u64) -> Result<(), StorageError> {
        let storage_key = self.storage_key(key);
        let blob = blob.to_vec();
        let expiry = Self::native_expiry(ttl_seconds);

        self.with_client(move |client| client.set(&storage_key, blob.as_slice(), expiry))
            .await
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let storage_key = self.storage_key(key);
        self.with_client(move |client| client.get::<Vec<u8>>(&storage_key))
            .await
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let storage_key = self.storage_key(key);
        self.with_client(move |client| client.delete(&storage_key))
            .await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.with_client(|client| client.flush()).await?;
        info!("Flushed memcached instance");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memcached"
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memcached_native_expiry_passthrough() {
        assert_eq!(MemcachedStore::native_expiry(60), 60);
        assert_eq!(MemcachedStore::native_expiry(MAX_RELATIVE_EXPIRY), 2_592_000);
    }

    #[test]
    fn test_memcached_native_expiry_clamps_long_ttls() {
        assert_eq!(MemcachedStore::native_expiry(MAX_RELATIVE_EXPIRY + 1), 0);
        assert_eq!(MemcachedStore::native_expiry(u64::MAX), 0);
        assert_eq!(MemcachedStore::native_expiry(0), 0);
    }

    #[tokio::test]
    #[ignore = "requires a running memcached instance on 127.0.0.1:11211"]
    async fn test_memcached_round_trip() {
        let store = MemcachedStore::connect("memcache://127.0.0.1:11211", "vault_cache_test")
            .await
            .unwrap();

        store.write("user:42", b"sealed bytes", 60).await.unwrap();
        assert_eq!(
            store.read("user:42").await.unwrap().as_deref(),
            Some(b"sealed bytes".as_slice())
        );

        assert!(store.delete("user:42").await.unwrap());
        assert!(!store.delete("user:42").await.unwrap());
        assert_eq!(store.read("user:42").await.unwrap(), None);
    }
}
