//! Background Tasks Module
//!
//! Opt-in background work. Nothing here runs unless the caller spawns it;
//! the cache's default behavior is read-time-only expiry.
//!
//! # Tasks
//! - TTL Sweep: Purges expired cache entries at configured intervals

mod sweep;

pub use sweep::spawn_sweep_task;
