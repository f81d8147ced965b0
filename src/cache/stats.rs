//! Cache Statistics Module
//!
//! Tracks per-process cache activity: hits, misses, expirations, evictions,
//! and self-healed entries.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time snapshot of cache activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of lookups that found nothing (absent or expired)
    pub misses: u64,
    /// Number of entries dropped because their TTL elapsed
    pub expired: u64,
    /// Number of entries evicted to respect capacity
    pub evictions: u64,
    /// Number of entries dropped after a failed read
    pub healed: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Stats Recorder ==
/// Lock-free counters shared by readers and writers of the store.
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    evictions: AtomicU64,
    healed: AtomicU64,
}

impl StatsRecorder {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expired(&self, count: u64) {
        self.expired.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_healed(&self) {
        self.healed.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the counters into a snapshot.
    pub fn snapshot(&self, total_entries: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            healed: self.healed.load(Ordering::Relaxed),
            total_entries,
        }
    }
}
