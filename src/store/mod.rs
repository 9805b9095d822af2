//! Storage Backend Module
//!
//! The persistence seam of the cache. Every backend stores opaque encrypted
//! blobs addressed by caller key and implements the same four-operation
//! contract, so the orchestrator's TTL, eviction, and crypto logic is written
//! exactly once.

use async_trait::async_trait;

use crate::error::StorageError;

mod filesystem;
mod memcached;
mod redis;
mod relational;

pub use filesystem::FilesystemStore;
pub use memcached::MemcachedStore;
pub use redis::RedisStore;
pub use relational::RelationalStore;

// == Cache Store Trait ==
/// One persistence medium for encrypted cache blobs.
///
/// Backends never interpret blob contents. The TTL passed to `write` is a
/// hint for media with native expiry (memcached, redis); the cache's own
/// expiry check stays authoritative, so backends without native expiry
/// simply ignore it.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Persists a blob under `key`, replacing any existing blob (implicit
    /// delete-then-write; idempotent).
    async fn write(&self, key: &str, blob: &[u8], ttl_seconds: u64) -> Result<(), StorageError>;

    /// Returns the blob stored under `key`, or `None` for a normal miss.
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Removes the blob under `key`.
    ///
    /// # Returns
    /// - `Ok(true)` if a blob was removed
    /// - `Ok(false)` if the key was absent (not an error)
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// Removes every blob this store owns, leaving unrelated data at the
    /// same storage location untouched.
    async fn clear(&self) -> Result<(), StorageError>;

    /// Backend label for logs.
    fn name(&self) -> &'static str;
}

// == Key Sanitizer ==
/// Maps a caller key to a form safe for use as a filename.
///
/// Any character outside `[A-Za-z0-9._-]` becomes `_`, then remaining `..`
/// sequences are flattened so a hostile key cannot traverse out of the cache
/// directory. Distinct keys can collide after sanitization; callers who need
/// collision-free names should keep their keys within the safe alphabet.
pub(crate) fn sanitize_key(key: &str) -> String {
    let mapped: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    mapped.replace("..", "__")
}
