//! TTL Sweep Task
//!
//! Background task that periodically purges expired cache entries.
//!
//! Without it, expired entries occupy backend storage until their next read.
//! That is the cache's documented default; spawn this task only when storage
//! pressure matters more than the extra backend traffic.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::Cache;

/// Spawns a background task that periodically purges expired cache entries.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between purge runs. Purge failures are logged and do not stop the loop;
/// the next tick retries.
///
/// # Arguments
/// * `cache` - Shared cache instance to sweep
/// * `sweep_interval_secs` - Interval in seconds between purge runs
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let config = CacheConfig::from_env();
/// let sweep_interval = config.sweep_interval;
/// let cache = Arc::new(Cache::new(store, config)?);
///
/// let sweep_handle = sweep_interval.map(|secs| spawn_sweep_task(cache.clone(), secs));
/// // Later, during shutdown:
/// if let Some(handle) = sweep_handle {
///     handle.abort();
/// }
/// ```
pub fn spawn_sweep_task(cache: Arc<Cache>, sweep_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(sweep_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting TTL sweep task with interval of {} seconds",
            sweep_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            match cache.purge_expired().await {
                Ok(removed) if removed > 0 => {
                    info!("TTL sweep: removed {} expired entries", removed);
                }
                Ok(_) => {
                    debug!("TTL sweep: no expired entries found");
                }
                Err(err) => {
                    warn!("TTL sweep failed, will retry next tick: {}", err);
                }
            }
        }
    })
}
