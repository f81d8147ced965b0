//! Cache Entry Module
//!
//! Defines the per-entry header and the on-disk entry file layout: the
//! encoded header immediately followed by the encoded value.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::cache::Codec;
use crate::error::{CacheError, Result};

/// Current on-disk format version.
pub const CURRENT_VERSION: u8 = 1;

// == Cache Header ==
/// Metadata stored in front of every entry and mirrored in the in-memory index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheHeader {
    /// Format version tag
    pub version: u8,
    /// Absolute expiration instant
    #[serde(with = "chrono::serde::ts_nanoseconds")]
    pub expiration: DateTime<Utc>,
    /// Original, un-hashed cache key
    pub key: String,
}

impl CacheHeader {
    // == Constructor ==
    /// Creates a header for `key` expiring `ttl` after `now`.
    ///
    /// TTLs that overflow the representable range saturate at the latest
    /// instant the on-disk format can hold.
    pub fn new(key: &str, ttl: Duration, now: DateTime<Utc>) -> Self {
        let expiration = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .filter(|at| *at <= max_expiration())
            .unwrap_or_else(max_expiration);

        Self {
            version: CURRENT_VERSION,
            expiration,
            key: key.to_string(),
        }
    }

    // == Is Expired ==
    /// An entry is expired once `now` is strictly after its expiration.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expiration
    }

    /// Checks the header against the current clock.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

}

/// Latest instant expressible as i64 nanoseconds since the epoch.
fn max_expiration() -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(i64::MAX)
}

// == Write Entry ==
/// Creates `path` and writes `header` followed by `value`, then syncs it to disk.
pub fn write_entry<C, T>(codec: &C, path: &Path, header: &CacheHeader, value: &T) -> Result<()>
where
    C: Codec,
    T: Serialize + ?Sized,
{
    let file = File::create(path).map_err(|e| CacheError::io("create", path, e))?;
    let mut writer = BufWriter::new(file);

    codec
        .encode(&mut writer, header)
        .and_then(|()| codec.encode(&mut writer, value))
        .map_err(|e| e.at_path(path))?;

    writer.flush().map_err(|e| CacheError::io("write", path, e))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| CacheError::io("sync", path, e))
}

/// Opens an entry file, returning the reader and the file length.
fn open_entry(path: &Path) -> Result<(BufReader<File>, u64)> {
    let file = File::open(path).map_err(|e| CacheError::io("open", path, e))?;
    let len = file
        .metadata()
        .map_err(|e| CacheError::io("stat", path, e))?
        .len();
    Ok((BufReader::new(file), len))
}

/// Tags a decode failure with the entry it came from. Stream failures keep
/// their I/O kind so a failing disk is not mistaken for a corrupt file.
fn decode_error(err: CacheError, part: &str, path: &Path) -> CacheError {
    match err {
        CacheError::Corrupted(msg) => CacheError::Corrupted(format!("{part}: {msg}")),
        other => other.at_path(path),
    }
}

fn decode_header<C, R>(codec: &C, reader: &mut R, limit: u64, path: &Path) -> Result<CacheHeader>
where
    C: Codec,
    R: std::io::BufRead,
{
    let header: CacheHeader = codec
        .decode(reader, limit)
        .map_err(|e| decode_error(e, "header", path))?;

    if header.version != CURRENT_VERSION {
        return Err(CacheError::Corrupted(format!(
            "unsupported format version {}",
            header.version
        )));
    }
    if header.key.is_empty() {
        return Err(CacheError::Corrupted("header has an empty key".to_string()));
    }
    Ok(header)
}

// == Read Header ==
/// Decodes only the header of the entry at `path`.
pub fn read_header<C: Codec>(codec: &C, path: &Path) -> Result<CacheHeader> {
    let (mut reader, len) = open_entry(path)?;
    decode_header(codec, &mut reader, len, path)
}

// == Read Entry ==
/// Decodes the entry at `path`, verifying it was written for `key`.
pub fn read_entry<C, T>(codec: &C, path: &Path, key: &str) -> Result<(CacheHeader, T)>
where
    C: Codec,
    T: DeserializeOwned,
{
    let (mut reader, len) = open_entry(path)?;
    let header = decode_header(codec, &mut reader, len, path)?;

    if header.key != key {
        return Err(CacheError::KeyMismatch {
            expected: key.to_string(),
            found: header.key,
        });
    }

    let value = codec
        .decode(&mut reader, len)
        .map_err(|e| decode_error(e, "value", path))?;
    Ok((header, value))
}
