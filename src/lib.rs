//! Vault Cache - An encrypted key/value cache with pluggable storage backends
//!
//! Stores arbitrary serializable values with TTL expiration and FIFO
//! eviction. Payloads are envelope-encrypted at rest: a per-cache data key
//! protects every entry and is itself wrapped under a caller-supplied master
//! key. Backends cover the local filesystem, SQLite, Memcached, and Redis
//! behind one storage trait, so the expiry, eviction, and crypto behavior is
//! identical on all of them.

pub mod cache;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod store;
pub mod tasks;

pub use cache::{Cache, CacheEntry, CacheStats, MAX_BLOB_SIZE, MAX_KEY_LENGTH};
pub use config::CacheConfig;
pub use error::{CacheError, CryptoError, Result, StorageError};
pub use store::{CacheStore, FilesystemStore, MemcachedStore, RedisStore, RelationalStore};
pub use tasks::spawn_sweep_task;
