//! Error types for the cache subsystem
//!
//! Provides unified error handling using thiserror. `CryptoError` and
//! `StorageError` cover the two fallible layers below the cache; `CacheError`
//! is the umbrella type surfaced to callers.

use thiserror::Error;

// == Crypto Error Enum ==
/// Errors raised by the encryption primitives and the key vault.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Key material has the wrong length for the cipher
    #[error("Invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// The OS entropy source failed
    #[error("Random number generation failed: {0}")]
    RandomGenerationFailed(String),

    /// AEAD encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// AEAD decryption failed (tampered data or wrong key)
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Ciphertext is too short to contain a nonce and authentication tag
    #[error("Malformed ciphertext: {0}")]
    MalformedCiphertext(String),
}

// == Storage Error Enum ==
/// Backend I/O errors, one variant per storage medium plus the async bridge.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Filesystem I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache directory missing, not a directory, or not writable
    #[error("Cache directory unusable: {0}")]
    UnusableDirectory(String),

    /// SQLite failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Memcached client failure
    #[error("Memcached error: {0}")]
    Memcached(#[from] memcache::MemcacheError),

    /// Redis client failure
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A spawn_blocking worker panicked or was cancelled
    #[error("Blocking task failed: {0}")]
    TaskJoin(String),
}

// == Cache Error Enum ==
/// Unified error type surfaced by the cache orchestrator.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Bad construction-time or format configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Invalid caller input (empty key, oversized key or payload)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Value could not be converted to or from its wire representation
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Encryption layer failure
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Storage backend failure
    #[error(transparent)]
    Storage(#[from] StorageError),
}

// == Result Type Alias ==
/// Convenience Result type for the cache subsystem.
pub type Result<T> = std::result::Result<T, CacheError>;
