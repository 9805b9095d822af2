//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;

use tracing::warn;

use crate::error::{CacheError, Result};

/// Placeholder master key used when none is configured.
///
/// Only acceptable for development and tests; `validate_strict` rejects it so
/// production deployments cannot start with cache entries wrapped under a
/// publicly known key.
pub const DEV_MASTER_KEY: &str = "REPLACE_WITH_REAL_MASTER_KEY_IN_PROD";

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible
/// defaults. Configuration is fixed at construction time; only the
/// serialization format can be changed later through `Cache::set_format`.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Master key wrapping the data-encryption key at rest
    pub master_key: String,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// Maximum number of entries tracked before FIFO eviction kicks in
    pub max_entries: usize,
    /// Serialization format name ("json" or "yaml" out of the box)
    pub format: String,
    /// Directory holding the wrapped data-encryption key blob
    pub key_dir: PathBuf,
    /// Namespace feeding the wrapped-key blob name; instances sharing a
    /// key_dir and namespace share one data-encryption key
    pub namespace: String,
    /// Optional background sweep period in seconds; None disables the sweep
    pub sweep_interval: Option<u64>,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// Logs a warning when the master key is left at the development
    /// placeholder. Use `from_env_strict` where that must be a hard error.
    ///
    /// # Environment Variables
    /// - `VAULT_CACHE_MASTER_KEY` - Master key material (default: dev placeholder)
    /// - `VAULT_CACHE_DEFAULT_TTL` - Default TTL in seconds (default: 600)
    /// - `VAULT_CACHE_MAX_ENTRIES` - Maximum tracked entries (default: 1000)
    /// - `VAULT_CACHE_FORMAT` - Serialization format name (default: "json")
    /// - `VAULT_CACHE_KEY_DIR` - Wrapped-key directory (default: ".vault_cache")
    /// - `VAULT_CACHE_NAMESPACE` - Key-blob namespace (default: "cache")
    /// - `VAULT_CACHE_SWEEP_INTERVAL` - Sweep period in seconds (default: unset)
    pub fn from_env() -> Self {
        let config = Self {
            master_key: env::var("VAULT_CACHE_MASTER_KEY")
                .unwrap_or_else(|_| DEV_MASTER_KEY.to_string()),
            default_ttl: env::var("VAULT_CACHE_DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(600),
            max_entries: env::var("VAULT_CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            format: env::var("VAULT_CACHE_FORMAT").unwrap_or_else(|_| "json".to_string()),
            key_dir: env::var("VAULT_CACHE_KEY_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".vault_cache")),
            namespace: env::var("VAULT_CACHE_NAMESPACE").unwrap_or_else(|_| "cache".to_string()),
            sweep_interval: env::var("VAULT_CACHE_SWEEP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok()),
        };

        if config.master_key == DEV_MASTER_KEY {
            warn!("VAULT_CACHE_MASTER_KEY not set, using the insecure development placeholder");
        }

        config
    }

    /// Loads configuration from the environment and refuses insecure key material.
    ///
    /// This is the production entry point: it fails with `CacheError::Config`
    /// when the master key is missing, empty, or left at the development
    /// placeholder.
    pub fn from_env_strict() -> Result<Self> {
        let config = Self::from_env();
        config.validate_strict()?;
        Ok(config)
    }

    /// Rejects configurations whose master key would not protect anything.
    pub fn validate_strict(&self) -> Result<()> {
        if self.master_key.is_empty() {
            return Err(CacheError::Config(
                "master key must not be empty".to_string(),
            ));
        }
        if self.master_key == DEV_MASTER_KEY {
            return Err(CacheError::Config(
                "master key is the insecure development placeholder".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            master_key: DEV_MASTER_KEY.to_string(),
            default_ttl: 600,
            max_entries: 1000,
            format: "json".to_string(),
            key_dir: PathBuf::from(".vault_cache"),
            namespace: "cache".to_string(),
            sweep_interval: None,
        }
    }
}
