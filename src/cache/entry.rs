//! Cache Entry Module
//!
//! Defines the envelope persisted for every cached value: the payload plus
//! the creation timestamp and TTL that drive expiry decisions.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// A single cached value with its expiry metadata.
///
/// This is the structure that gets encoded and encrypted at rest. The payload
/// is kept as a self-describing JSON value so one stored shape can be read
/// back as any compatible caller type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Creation timestamp (Unix seconds)
    pub created_at: u64,
    /// Lifetime in seconds, measured from `created_at`
    pub ttl: u64,
    /// The stored payload
    pub data: serde_json::Value,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry stamped with the current time.
    ///
    /// # Arguments
    /// * `data` - The payload to store
    /// * `ttl_seconds` - Lifetime in seconds
    pub fn new(data: serde_json::Value, ttl_seconds: u64) -> Self {
        Self {
            created_at: current_timestamp_secs(),
            ttl: ttl_seconds,
            data,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has outlived its TTL.
    ///
    /// Boundary condition: an entry is expired only once its age strictly
    /// exceeds the TTL. An entry aged exactly `ttl` seconds is still served.
    ///
    /// # Returns
    /// - `true` if more than `ttl` seconds have passed since creation
    /// - `false` otherwise, including for entries stamped in the future
    pub fn is_expired(&self) -> bool {
        current_timestamp_secs().saturating_sub(self.created_at) > self.ttl
    }

    // == Time To Live ==
    /// Returns remaining lifetime in seconds, `0` once expired.
    ///
    /// This method is useful for debugging and statistics purposes.
    pub fn remaining_ttl(&self) -> u64 {
        let age = current_timestamp_secs().saturating_sub(self.created_at);
        self.ttl.saturating_sub(age)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in seconds.
pub fn current_timestamp_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs()
}
