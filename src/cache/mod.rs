//! Cache Module
//!
//! Provides a disk-backed cache with TTL expiration, capacity-bounded
//! eviction, and self-healing reads.

mod codec;
mod entry;
mod eviction;
mod hasher;
mod options;
mod scanner;
mod stats;
mod store;


// Re-export public types
pub use codec::{BincodeCodec, Codec, JsonCodec};
pub use entry::{CacheHeader, CURRENT_VERSION};
pub use eviction::{EvictionStrategy, RANDOM_EVICT_THRESHOLD};
pub use hasher::hash_key;
pub use options::{CacheOptions, DEFAULT_EVICT_PERCENT, DEFAULT_MAX_ITEMS};
pub use stats::CacheStats;
pub use store::FileCache;
