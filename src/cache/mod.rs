//! Cache Module
//!
//! Provides the encrypted key/value cache with TTL expiration and FIFO
//! eviction over pluggable storage backends.

mod engine;
mod entry;
mod queue;
mod stats;


// Re-export public types
pub use engine::Cache;
pub use entry::{current_timestamp_secs, CacheEntry};
pub use stats::CacheStats;

pub(crate) use queue::EvictionQueue;
pub(crate) use stats::StatsRecorder;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed encoded entry size in bytes
pub const MAX_BLOB_SIZE: usize = 1024 * 1024; // 1 MB
