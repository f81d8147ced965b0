//! Mini File Cache - A disk-backed key/value cache
//!
//! Persists values across restarts with per-entry TTL, bounded capacity, and
//! automatic recovery from corrupt or tampered entry files.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{CacheOptions, FileCache};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::spawn_cleanup_task;
