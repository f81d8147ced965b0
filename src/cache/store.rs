//! Cache Store Module
//!
//! Main cache engine: an in-memory index of entry headers backed by one file
//! per entry, with atomic writes, lazy expiration, and self-healing reads.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::cache::entry::{read_entry, write_entry};
use crate::cache::eviction::select_victims;
use crate::cache::scanner::scan_dir;
use crate::cache::stats::StatsRecorder;
use crate::cache::{hash_key, BincodeCodec, CacheHeader, CacheOptions, CacheStats, Codec};
use crate::error::{CacheError, Result};

// == File Cache ==
/// Disk-backed key/value cache with per-entry TTL.
///
/// Writers (`set`, `remove`, `clean_expired`, `clear`) hold the lock for the
/// whole operation, disk I/O included. `get` only holds the shared lock while
/// it copies the header, so reads hit the filesystem in parallel.
#[derive(Debug)]
pub struct FileCache<C: Codec = BincodeCodec> {
    /// Directory holding one file per entry
    dir: PathBuf,
    /// Capacity and eviction settings
    options: CacheOptions,
    /// Serialization for headers and values
    codec: C,
    /// Index and eviction sampler
    state: RwLock<CacheState>,
    /// Activity counters
    stats: StatsRecorder,
}

#[derive(Debug)]
struct CacheState {
    /// Original key -> header of its live entry file
    index: HashMap<String, CacheHeader>,
    /// Used only by random-sample eviction, always under the write lock
    rng: StdRng,
}

impl FileCache<BincodeCodec> {
    // == Constructor ==
    /// Opens (creating if needed) a cache in `dir` using the bincode codec.
    ///
    /// Every file already in `dir` is validated; corrupt, tampered, and expired
    /// entries are deleted. Fails only if `dir` cannot be created or listed.
    pub fn open(dir: impl AsRef<Path>, options: CacheOptions) -> Result<Self> {
        Self::with_codec(dir, options, BincodeCodec)
    }
}

impl<C: Codec> FileCache<C> {
    /// Opens a cache in `dir` with an explicit codec.
    pub fn with_codec(dir: impl AsRef<Path>, options: CacheOptions, codec: C) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| CacheError::io("create directory", &dir, e))?;

        let report = scan_dir(&codec, &dir)?;
        let rng = match options.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            dir,
            options,
            codec,
            state: RwLock::new(CacheState {
                index: report.index,
                rng,
            }),
            stats: StatsRecorder::default(),
        })
    }

    // == Set ==
    /// Stores `value` under `key`, expiring after `ttl`.
    ///
    /// Inserting a new key into a full cache evicts first. The entry is
    /// written to a temporary sibling and renamed into place, so a failed
    /// write leaves any previous value for `key` untouched.
    pub fn set<T>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        validate_key(key)?;

        let mut state = self.state.write();
        if !state.index.contains_key(key) {
            self.evict(&mut state);
        }

        let header = CacheHeader::new(key, ttl, Utc::now());
        let path = self.entry_path(key);
        let temp_path = path.with_extension("tmp");

        if let Err(e) = write_entry(&self.codec, &temp_path, &header, value) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
        if let Err(e) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(CacheError::io("rename", &temp_path, e));
        }

        debug!(key, expiration = %header.expiration, "Cache entry written");
        state.index.insert(key.to_string(), header);
        Ok(())
    }

    // == Get ==
    /// Retrieves the value stored under `key`.
    ///
    /// Returns `Ok(None)` for absent or expired keys. If the entry file is
    /// missing, corrupt, or belongs to another key, the entry is dropped from
    /// the index and the error is returned; the next lookup reports `None`.
    pub fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        validate_key(key)?;

        let snapshot = self.state.read().index.get(key).cloned();
        let Some(snapshot) = snapshot else {
            self.stats.record_miss();
            return Ok(None);
        };

        let now = Utc::now();
        if snapshot.is_expired_at(now) {
            self.expire(key, now);
            self.stats.record_miss();
            return Ok(None);
        }

        match read_entry(&self.codec, &self.entry_path(key), key) {
            Ok((_, value)) => {
                self.stats.record_hit();
                Ok(Some(value))
            }
            Err(err) => {
                if err.is_self_healing() {
                    self.heal(key, &snapshot, &err);
                }
                Err(err)
            }
        }
    }

    // == Remove ==
    /// Deletes `key`. Removing an absent key is not an error.
    pub fn remove(&self, key: &str) -> Result<()> {
        let mut state = self.state.write();
        if !state.index.contains_key(key) {
            return Ok(());
        }
        self.remove_locked(&mut state.index, key)
    }

    // == Clean Expired ==
    /// Removes every entry whose TTL has elapsed, returning how many were
    /// dropped. Failures to delete individual files are logged and skipped.
    pub fn clean_expired(&self) -> Result<usize> {
        let mut state = self.state.write();
        let now = Utc::now();

        let expired: Vec<String> = state
            .index
            .iter()
            .filter(|(_, header)| header.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            if let Err(e) = self.remove_locked(&mut state.index, key) {
                warn!(key = %key, error = %e, "Failed to delete expired cache file");
            }
        }

        self.stats.record_expired(expired.len() as u64);
        Ok(expired.len())
    }

    // == Clear ==
    /// Removes every entry.
    pub fn clear(&self) -> Result<()> {
        let mut state = self.state.write();
        let keys: Vec<String> = state.index.keys().cloned().collect();

        for key in &keys {
            if let Err(e) = self.remove_locked(&mut state.index, key) {
                warn!(key = %key, error = %e, "Failed to delete cache file during clear");
            }
        }

        debug!(removed = keys.len(), "Cache cleared");
        Ok(())
    }

    // == Size ==
    /// Returns the number of entries in the index.
    pub fn size(&self) -> usize {
        self.state.read().index.len()
    }

    /// Returns true if `key` has an unexpired entry in the index.
    pub fn contains(&self, key: &str) -> bool {
        self.state
            .read()
            .index
            .get(key)
            .is_some_and(|header| !header.is_expired())
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.size())
    }

    /// Directory holding the entry files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Settings the cache was opened with.
    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Path of the entry file for `key`.
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(hash_key(key))
    }

    /// Makes room for one new entry if the cache is full.
    fn evict(&self, state: &mut CacheState) {
        if !self.options.eviction_enabled() {
            return;
        }

        let victims = select_victims(
            &state.index,
            self.options.max_items,
            self.options.evict_percent,
            &mut state.rng,
        );
        if victims.is_empty() {
            return;
        }

        for key in &victims {
            if let Err(e) = self.remove_locked(&mut state.index, key) {
                warn!(key = %key, error = %e, "Failed to delete evicted cache file");
            }
        }

        self.stats.record_evictions(victims.len() as u64);
        debug!(
            evicted = victims.len(),
            remaining = state.index.len(),
            "Evicted cache entries"
        );
    }

    /// Drops `key` if it is still present and still expired as of `now`.
    fn expire(&self, key: &str, now: chrono::DateTime<Utc>) {
        let mut state = self.state.write();
        let still_expired = state
            .index
            .get(key)
            .is_some_and(|header| header.is_expired_at(now));

        if still_expired {
            if let Err(e) = self.remove_locked(&mut state.index, key) {
                warn!(key, error = %e, "Failed to delete expired cache file");
            }
            self.stats.record_expired(1);
        }
    }

    /// Drops `key` after a failed read, unless a newer write replaced the
    /// header we read from.
    fn heal(&self, key: &str, snapshot: &CacheHeader, cause: &CacheError) {
        let mut state = self.state.write();
        if state.index.get(key) != Some(snapshot) {
            return;
        }

        warn!(key, error = %cause, "Dropping unreadable cache entry");
        if let Err(e) = self.remove_locked(&mut state.index, key) {
            warn!(key, error = %e, "Failed to delete unreadable cache file");
        }
        self.stats.record_healed();
    }

    /// Removes `key` from the index and deletes its file. A file that is
    /// already gone is not an error. Caller must hold the write lock.
    fn remove_locked(&self, index: &mut HashMap<String, CacheHeader>, key: &str) -> Result<()> {
        index.remove(key);

        let path = self.entry_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::io("remove", path, e)),
        }
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::EmptyKey);
    }
    Ok(())
}
