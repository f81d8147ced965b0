//! Configuration Module
//!
//! Handles loading cache settings from environment variables.

use std::env;
use std::path::PathBuf;

use crate::cache::{CacheOptions, DEFAULT_EVICT_PERCENT, DEFAULT_MAX_ITEMS};

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the cache entry files
    pub cache_dir: PathBuf,
    /// Maximum number of entries; 0 disables eviction
    pub max_items: usize,
    /// Fraction of entries evicted when the cache is full
    pub evict_percent: f64,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DIR` - Cache directory (default: ./cache)
    /// - `CACHE_MAX_ITEMS` - Maximum cache entries (default: 500)
    /// - `CACHE_EVICT_PERCENT` - Eviction fraction in (0, 1) (default: 0.3)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_dir: env::var_os("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            max_items: env::var("CACHE_MAX_ITEMS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_items),
            evict_percent: env::var("CACHE_EVICT_PERCENT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.evict_percent),
            cleanup_interval: env::var("CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cleanup_interval),
        }
    }

    /// Converts into the options used to open a cache. An out-of-range
    /// eviction fraction falls back to the default.
    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions::new()
            .with_max_items(self.max_items)
            .with_evict_percent(self.evict_percent)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./cache"),
            max_items: DEFAULT_MAX_ITEMS,
            evict_percent: DEFAULT_EVICT_PERCENT,
            cleanup_interval: 60,
        }
    }
}
