//! Cache Options Module
//!
//! Construction-time settings for [`crate::cache::FileCache`].

/// Default maximum number of entries.
pub const DEFAULT_MAX_ITEMS: usize = 500;

/// Default fraction of entries evicted when the cache is full.
pub const DEFAULT_EVICT_PERCENT: f64 = 0.3;

// == Cache Options ==
/// Capacity and eviction settings applied when a cache is opened.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheOptions {
    /// Maximum number of entries; 0 disables capacity-based eviction
    pub max_items: usize,
    /// Fraction of entries evicted per eviction round, in (0, 1)
    pub evict_percent: f64,
    /// Fixed seed for the eviction sampler; `None` seeds from OS entropy
    pub rng_seed: Option<u64>,
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the entry limit. Zero disables eviction.
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    /// Sets the eviction fraction. Values outside (0, 1) are ignored and the
    /// current setting is kept.
    pub fn with_evict_percent(mut self, percent: f64) -> Self {
        if percent > 0.0 && percent < 1.0 {
            self.evict_percent = percent;
        }
        self
    }

    /// Makes random-sample eviction reproducible.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Returns true if capacity-based eviction is enabled.
    pub fn eviction_enabled(&self) -> bool {
        self.max_items > 0
    }
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            evict_percent: DEFAULT_EVICT_PERCENT,
            rng_seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_default() {
        let options = CacheOptions::default();
        assert_eq!(options.max_items, 500);
        assert_eq!(options.evict_percent, 0.3);
        assert!(options.rng_seed.is_none());
        assert!(options.eviction_enabled());
    }

    #[test]
    fn test_invalid_evict_percent_is_ignored() {
        for bad in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            let options = CacheOptions::new().with_evict_percent(bad);
            assert_eq!(options.evict_percent, DEFAULT_EVICT_PERCENT, "accepted {bad}");
        }

        let options = CacheOptions::new().with_evict_percent(0.5);
        assert_eq!(options.evict_percent, 0.5);
    }

    #[test]
    fn test_zero_max_items_disables_eviction() {
        let options = CacheOptions::new().with_max_items(0);
        assert!(!options.eviction_enabled());
    }
}
