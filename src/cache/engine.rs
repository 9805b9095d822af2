//! Cache Engine Module
//!
//! The orchestrator combining the key vault, serialization codecs, eviction
//! queue, and a storage backend into the public set/get/delete/clear contract.
//! TTL expiry, FIFO eviction, and encryption live here exactly once, so every
//! backend behaves identically.

use std::fmt;
use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{
    CacheEntry, CacheStats, EvictionQueue, StatsRecorder, MAX_BLOB_SIZE, MAX_KEY_LENGTH,
};
use crate::codec::{Codec, CodecRegistry};
use crate::config::CacheConfig;
use crate::crypto::{provider, KeyVault};
use crate::error::{CacheError, Result};
use crate::store::CacheStore;

// == Cache ==
/// Encrypted, TTL-bounded key/value cache over a pluggable storage backend.
///
/// Values are serialized with the active codec, encrypted with the vault's
/// data key, and handed to the backend as opaque blobs. Reads reverse the
/// pipeline and treat anything unreadable as a self-healing miss: a cache is
/// advisory storage, so corrupt entries are deleted rather than surfaced as
/// errors.
///
/// The write-enqueue-evict sequence runs under one instance mutex, so the
/// tracked entry count never exceeds `max_entries` even under concurrent
/// sets. The cache is `Send + Sync` and meant to be shared via `Arc`.
pub struct Cache {
    /// Backend persistence for encrypted blobs
    store: Arc<dyn CacheStore>,
    /// Data-encryption key management
    vault: KeyVault,
    /// Registered serialization formats
    registry: CodecRegistry,
    /// Name of the active serialization format
    format: RwLock<String>,
    /// FIFO insertion-order tracking, also the instance write lock
    queue: Mutex<EvictionQueue>,
    /// Performance statistics
    stats: StatsRecorder,
    /// Default TTL in seconds for entries without explicit TTL
    default_ttl: u64,
    /// Maximum number of entries tracked before eviction
    max_entries: usize,
}

impl Cache {
    // == Constructors ==
    /// Creates a cache over `store` with the built-in codecs (json, yaml).
    ///
    /// # Arguments
    /// * `store` - Storage backend for encrypted blobs
    /// * `config` - Constructor-time configuration
    pub fn new(store: Arc<dyn CacheStore>, config: CacheConfig) -> Result<Self> {
        Self::with_registry(store, config, CodecRegistry::builtin())
    }

    /// Creates a cache with a caller-assembled codec registry.
    ///
    /// Use this to plug in formats beyond the built-ins. The registry is
    /// fixed for the cache's lifetime; only the active format name can change
    /// afterwards.
    pub fn with_registry(
        store: Arc<dyn CacheStore>,
        config: CacheConfig,
        registry: CodecRegistry,
    ) -> Result<Self> {
        if config.max_entries == 0 {
            return Err(CacheError::Config(
                "max_entries must be greater than zero".to_string(),
            ));
        }
        if config.default_ttl == 0 {
            return Err(CacheError::Config(
                "default_ttl must be greater than zero".to_string(),
            ));
        }
        if !registry.contains(&config.format) {
            return Err(CacheError::Config(format!(
                "unknown serialization format '{}' (registered: {})",
                config.format,
                registry.names().join(", ")
            )));
        }

        info!(
            "Cache initialized: backend={}, format={}, max_entries={}, default_ttl={}s",
            store.name(),
            config.format,
            config.max_entries,
            config.default_ttl
        );

        let vault = KeyVault::new(config.key_dir, &config.master_key, &config.namespace);
        Ok(Self {
            store,
            vault,
            registry,
            format: RwLock::new(config.format),
            queue: Mutex::new(EvictionQueue::new()),
            stats: StatsRecorder::new(),
            default_ttl: config.default_ttl,
            max_entries: config.max_entries,
        })
    }

    // == Set ==
    /// Stores a value under `key` with an optional TTL.
    ///
    /// The value is converted to its self-describing form, encoded with the
    /// active codec, encrypted, and written to the backend. An existing entry
    /// is overwritten and its eviction slot reset. Once the tracked entry
    /// count exceeds capacity, the oldest-inserted entries are evicted.
    ///
    /// # Arguments
    /// * `key` - Non-empty key, at most `MAX_KEY_LENGTH` bytes
    /// * `value` - Any serializable value
    /// * `ttl` - TTL in seconds; `None` or `Some(0)` means the configured default
    pub async fn set<T>(&self, key: &str, value: &T, ttl: Option<u64>) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.validate_key(key)?;

        let data =
            serde_json::to_value(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        let ttl = match ttl {
            Some(t) if t > 0 => t,
            _ => self.default_ttl,
        };
        let entry = CacheEntry::new(data, ttl);

        let encoded = self.current_codec()?.encode(&entry)?;
        if encoded.len() > MAX_BLOB_SIZE {
            return Err(CacheError::InvalidRequest(format!(
                "Encoded entry exceeds maximum size of {} bytes",
                MAX_BLOB_SIZE
            )));
        }

        let dek = self.vault.data_key().await?;
        let blob = provider::encrypt(&encoded, dek)?;

        // Write, enqueue, and evict as one unit so concurrent sets cannot
        // push the tracked count past capacity
        let mut queue = self.queue.lock().await;
        self.store.write(key, &blob, entry.ttl).await?;
        queue.enqueue(key);

        while queue.len() > self.max_entries {
            let Some(victim) = queue.dequeue() else { break };
            self.stats.record_eviction();
            debug!("Evicting oldest entry '{}'", victim);
            if let Err(err) = self.store.delete(&victim).await {
                warn!("Failed to delete evicted entry '{}': {}", victim, err);
            }
        }
        self.stats.set_total_entries(queue.len());

        debug!(
            "Stored entry '{}' (ttl {}s) via {}",
            key,
            entry.ttl,
            self.store.name()
        );
        Ok(())
    }

    // == Get ==
    /// Retrieves the value stored under `key`.
    ///
    /// Returns `Ok(None)` for a miss: key absent, entry expired, or entry
    /// unreadable (tampered ciphertext, foreign-format bytes). Expired and
    /// unreadable entries are deleted on the way out. A value that decrypts
    /// and decodes but cannot be converted to `T` is a genuine caller error
    /// and surfaces as `CacheError::Serialization` with the entry intact.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let blob = match self.store.read(key).await? {
            Some(blob) => blob,
            None => {
                self.stats.record_miss();
                debug!("Cache miss for '{}'", key);
                return Ok(None);
            }
        };

        let entry = match self.open_blob(&blob).await? {
            Some(entry) => entry,
            None => {
                warn!("Discarding unreadable entry '{}'", key);
                self.discard(key).await;
                self.stats.record_miss();
                return Ok(None);
            }
        };

        if entry.is_expired() {
            debug!("Discarding expired entry '{}'", key);
            self.discard(key).await;
            self.stats.record_expiration();
            self.stats.record_miss();
            return Ok(None);
        }

        let value = serde_json::from_value(entry.data)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.stats.record_hit();
        Ok(Some(value))
    }

    // == Delete ==
    /// Removes the entry under `key`.
    ///
    /// # Returns
    /// - `Ok(true)` if an entry was removed
    /// - `Ok(false)` if the key was absent (not an error)
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let mut queue = self.queue.lock().await;
        let removed = self.store.delete(key).await?;
        queue.remove(key);
        self.stats.set_total_entries(queue.len());

        if removed {
            debug!("Deleted entry '{}'", key);
        }
        Ok(removed)
    }

    // == Clear ==
    /// Removes every cache-owned entry from the backend.
    pub async fn clear(&self) -> Result<()> {
        let mut queue = self.queue.lock().await;
        self.store.clear().await?;
        queue.clear();
        self.stats.set_total_entries(0);

        info!("Cache cleared via {}", self.store.name());
        Ok(())
    }

    // == Format ==
    /// Switches the active serialization format.
    ///
    /// The name must be registered. Entries written under another format
    /// self-heal as misses on their next read.
    pub fn set_format(&self, name: &str) -> Result<()> {
        if !self.registry.contains(name) {
            return Err(CacheError::Config(format!(
                "unknown serialization format '{}' (registered: {})",
                name,
                self.registry.names().join(", ")
            )));
        }

        let mut format = self.format.write().unwrap();
        if *format != name {
            info!("Switched serialization format from {} to {}", format, name);
            *format = name.to_string();
        }
        Ok(())
    }

    /// Returns the active serialization format name.
    pub fn format(&self) -> String {
        self.format.read().unwrap().clone()
    }

    // == Stats ==
    /// Returns a snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    // == Purge Expired ==
    /// Removes every tracked entry whose TTL has elapsed.
    ///
    /// Walks the insertion-order snapshot and probes each entry through the
    /// normal read path, so corrupt entries found along the way are discarded
    /// too. Entries the backend already dropped (native TTL) fall out of the
    /// queue without being counted.
    ///
    /// # Returns
    /// The number of entries removed.
    pub async fn purge_expired(&self) -> Result<usize> {
        let tracked = self.queue.lock().await.keys();
        let mut removed = 0usize;

        for key in tracked {
            let blob = match self.store.read(&key).await {
                Ok(Some(blob)) => blob,
                Ok(None) => {
                    // Backend dropped it already; just stop tracking
                    let mut queue = self.queue.lock().await;
                    queue.remove(&key);
                    self.stats.set_total_entries(queue.len());
                    continue;
                }
                Err(err) => {
                    warn!("Purge could not read entry '{}': {}", key, err);
                    continue;
                }
            };

            match self.open_blob(&blob).await? {
                Some(entry) if entry.is_expired() => {
                    debug!("Purging expired entry '{}'", key);
                    self.discard(&key).await;
                    self.stats.record_expiration();
                    removed += 1;
                }
                Some(_) => {}
                None => {
                    warn!("Purging unreadable entry '{}'", key);
                    self.discard(&key).await;
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            info!("Purge removed {} entries", removed);
        }
        Ok(removed)
    }

    // == Internals ==
    fn validate_key(&self, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(CacheError::InvalidRequest(
                "Key must not be empty".to_string(),
            ));
        }
        if key.len() > MAX_KEY_LENGTH {
            return Err(CacheError::InvalidRequest(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }
        Ok(())
    }

    fn current_codec(&self) -> Result<Arc<dyn Codec>> {
        let format = self.format.read().unwrap();
        self.registry.get(&format).ok_or_else(|| {
            CacheError::Config(format!("unknown serialization format '{}'", *format))
        })
    }

    /// Decrypts and decodes a stored blob.
    ///
    /// `Ok(None)` means the blob is unreadable (corrupt data, wrong key era,
    /// foreign format) and should be treated as a self-healing miss. Hard
    /// failures of the vault itself still propagate.
    async fn open_blob(&self, blob: &[u8]) -> Result<Option<CacheEntry>> {
        let dek = self.vault.data_key().await?;

        let encoded = match provider::decrypt(blob, dek) {
            Ok(encoded) => encoded,
            Err(err) => {
                debug!("Entry failed decryption: {}", err);
                return Ok(None);
            }
        };

        match self.current_codec()?.decode(&encoded) {
            Ok(entry) => Ok(Some(entry)),
            Err(err) => {
                debug!("Entry failed decoding: {}", err);
                Ok(None)
            }
        }
    }

    /// Drops an entry from the backend and the queue, logging instead of
    /// failing when the backend delete does not cooperate.
    async fn discard(&self, key: &str) {
        let mut queue = self.queue.lock().await;
        if let Err(err) = self.store.delete(key).await {
            warn!("Failed to delete entry '{}': {}", key, err);
        }
        queue.remove(key);
        self.stats.set_total_entries(queue.len());
    }
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("backend", &self.store.name())
            .field("format", &self.format())
            .field("max_entries", &self.max_entries)
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}
