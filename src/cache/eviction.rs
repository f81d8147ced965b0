//! Eviction Module
//!
//! Chooses which entries to drop when an insert would push the cache past its
//! configured capacity. Small caches evict the entries closest to their own
//! expiration; large caches sample victims at random to skip the sort.

use std::collections::HashMap;

use rand::Rng;

use crate::cache::CacheHeader;

/// Above this many entries (both configured and actual) eviction switches to
/// random sampling.
pub const RANDOM_EVICT_THRESHOLD: usize = 1000;

// == Eviction Strategy ==
/// Victim selection algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionStrategy {
    /// Sort by expiration and drop the earliest-expiring entries. O(n log n).
    OldestExpiration,
    /// Drop uniformly sampled entries, ignoring expirations.
    RandomSample,
}

impl EvictionStrategy {
    /// Picks the strategy for a cache with the given limit and current size.
    pub fn for_size(max_items: usize, len: usize) -> Self {
        if max_items > RANDOM_EVICT_THRESHOLD && len > RANDOM_EVICT_THRESHOLD {
            EvictionStrategy::RandomSample
        } else {
            EvictionStrategy::OldestExpiration
        }
    }
}

// == Victim Count ==
/// Number of entries to evict from a cache holding `len` entries before one
/// more is inserted.
///
/// The larger of `floor(len * evict_percent)` and the overflow past
/// `max_items`, so the insert lands at or below capacity even when the cache
/// was reopened over a directory holding more than `max_items` entries.
/// Always at least one for a non-empty cache.
pub fn victim_count(len: usize, max_items: usize, evict_percent: f64) -> usize {
    if len == 0 {
        return 0;
    }
    let by_percent = (len as f64 * evict_percent).floor() as usize;
    let overflow = (len + 1).saturating_sub(max_items);
    by_percent.max(overflow).clamp(1, len)
}

// == Select Victims ==
/// Returns the keys to evict, or nothing if the cache is still below
/// `max_items`. A `max_items` of zero disables eviction.
pub fn select_victims<R: Rng>(
    index: &HashMap<String, CacheHeader>,
    max_items: usize,
    evict_percent: f64,
    rng: &mut R,
) -> Vec<String> {
    if max_items == 0 || index.len() < max_items {
        return Vec::new();
    }

    let count = victim_count(index.len(), max_items, evict_percent);
    match EvictionStrategy::for_size(max_items, index.len()) {
        EvictionStrategy::OldestExpiration => oldest_expiration(index, count),
        EvictionStrategy::RandomSample => random_sample(index, count, rng),
    }
}

fn oldest_expiration(index: &HashMap<String, CacheHeader>, count: usize) -> Vec<String> {
    let mut items: Vec<(&String, &CacheHeader)> = index.iter().collect();
    items.sort_unstable_by_key(|(_, header)| header.expiration);

    items
        .into_iter()
        .take(count)
        .map(|(key, _)| key.clone())
        .collect()
}

fn random_sample<R: Rng>(
    index: &HashMap<String, CacheHeader>,
    count: usize,
    rng: &mut R,
) -> Vec<String> {
    // HashMap order differs per map; sort so a seeded rng picks the same keys.
    let mut pool: Vec<&String> = index.keys().collect();
    pool.sort_unstable();
    let mut victims = Vec::with_capacity(count);

    while victims.len() < count && !pool.is_empty() {
        let pick = rng.gen_range(0..pool.len());
        victims.push(pool.swap_remove(pick).clone());
    }

    victims
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use std::time::Duration;

    /// Builds an index where `key_i` expires `i` seconds from now.
    fn index_of(len: usize) -> HashMap<String, CacheHeader> {
        let now = Utc::now();
        (0..len)
            .map(|i| {
                let key = format!("key_{i}");
                let header = CacheHeader::new(&key, Duration::from_secs(i as u64 + 1), now);
                (key, header)
            })
            .collect()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_victim_count() {
        assert_eq!(victim_count(0, 10, 0.3), 0);
        assert_eq!(victim_count(1, 1, 0.3), 1);
        assert_eq!(victim_count(2, 2, 0.5), 1);
        assert_eq!(victim_count(10, 10, 0.3), 3);
        assert_eq!(victim_count(10, 10, 0.99), 9);
    }

    #[test]
    fn test_victim_count_covers_overflow_past_max_items() {
        // 10 entries on disk, limit 2: 9 must go so the insert leaves 2
        assert_eq!(victim_count(10, 2, 0.3), 9);
        assert_eq!(victim_count(10, 2, 0.99), 9);
        assert_eq!(victim_count(10, 1, 0.3), 10);
        assert_eq!(victim_count(1001, 1001, 0.3), 300);
    }

    #[test]
    fn test_over_capacity_index_is_trimmed_to_fit() {
        let index = index_of(10);
        let victims = select_victims(&index, 2, 0.3, &mut rng());
        assert_eq!(victims.len(), 9);
        // Soonest-expiring first; key_9 survives
        assert!(!victims.contains(&"key_9".to_string()));
    }

    #[test]
    fn test_random_sample_is_reproducible_across_maps() {
        let first = index_of(50);
        let second: HashMap<String, CacheHeader> =
            first.iter().map(|(k, v)| (k.clone(), v.clone())).collect();

        assert_eq!(
            random_sample(&first, 10, &mut rng()),
            random_sample(&second, 10, &mut rng())
        );
    }

    #[test]
    fn test_strategy_threshold() {
        assert_eq!(
            EvictionStrategy::for_size(500, 500),
            EvictionStrategy::OldestExpiration
        );
        assert_eq!(
            EvictionStrategy::for_size(1000, 1000),
            EvictionStrategy::OldestExpiration
        );
        // Both dimensions must exceed the threshold
        assert_eq!(
            EvictionStrategy::for_size(5000, 1000),
            EvictionStrategy::OldestExpiration
        );
        assert_eq!(
            EvictionStrategy::for_size(1001, 1001),
            EvictionStrategy::RandomSample
        );
    }

    #[test]
    fn test_no_victims_below_capacity() {
        let index = index_of(5);
        assert!(select_victims(&index, 10, 0.3, &mut rng()).is_empty());
    }

    #[test]
    fn test_zero_max_items_disables_eviction() {
        let index = index_of(5);
        assert!(select_victims(&index, 0, 0.3, &mut rng()).is_empty());
    }

    #[test]
    fn test_oldest_expiration_picks_soonest_expiring() {
        let mut index = index_of(10);
        // Make key_9 the soonest to expire
        index.get_mut("key_9").unwrap().expiration = Utc::now() - TimeDelta::seconds(1);

        let victims = select_victims(&index, 10, 0.3, &mut rng());
        assert_eq!(victims, vec!["key_9", "key_0", "key_1"]);
    }

    #[test]
    fn test_random_sample_picks_distinct_keys() {
        let index = index_of(RANDOM_EVICT_THRESHOLD + 1);
        let victims = select_victims(&index, RANDOM_EVICT_THRESHOLD + 1, 0.3, &mut rng());

        let expected = victim_count(index.len(), RANDOM_EVICT_THRESHOLD + 1, 0.3);
        assert_eq!(victims.len(), expected);
        let unique: HashSet<_> = victims.iter().collect();
        assert_eq!(unique.len(), expected);
        assert!(victims.iter().all(|k| index.contains_key(k)));
    }

    #[test]
    fn test_random_sample_is_roughly_uniform() {
        let index = index_of(10);
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut rng = rng();

        let trials = 10_000;
        for _ in 0..trials {
            for key in random_sample(&index, 1, &mut rng) {
                *counts.entry(key).or_default() += 1;
            }
        }

        // Each of 10 keys expects ~1000 picks
        assert_eq!(counts.len(), 10);
        for (key, count) in counts {
            assert!((800..1200).contains(&count), "{key} picked {count} times");
        }
    }
}
