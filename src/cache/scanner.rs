//! Directory Scanner Module
//!
//! Rebuilds the in-memory index from the entry files found on disk at startup.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cache::entry::{read_header, CacheHeader};
use crate::cache::hasher::{hash_key, is_entry_file_name};
use crate::cache::Codec;
use crate::error::{CacheError, Result};

// == Scan Report ==
/// Outcome of a startup scan.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Index rebuilt from valid, unexpired entries
    pub index: HashMap<String, CacheHeader>,
    /// Number of files discarded as corrupt, tampered, or expired
    pub discarded: usize,
}

// == Scan Directory ==
/// Validates every regular file in `dir` and returns the surviving index.
///
/// A file survives only if its header decodes, its stored key hashes to its
/// file name, and it has not expired. Everything else is deleted best-effort.
/// Only failing to enumerate `dir` is an error.
pub fn scan_dir<C: Codec>(codec: &C, dir: &Path) -> Result<ScanReport> {
    let entries = fs::read_dir(dir).map_err(|e| CacheError::io("read directory", dir, e))?;

    let now = Utc::now();
    let mut index = HashMap::new();
    let mut doomed: Vec<PathBuf> = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| CacheError::io("read directory", dir, e))?;
        let path = entry.path();

        match entry.file_type() {
            Ok(file_type) if file_type.is_dir() => continue,
            Ok(_) => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable directory entry");
                continue;
            }
        }

        let file_name = entry.file_name().to_string_lossy().into_owned();
        match validate(codec, &path, &file_name, now) {
            Ok(header) => {
                index.insert(header.key.clone(), header);
            }
            Err(reason) => {
                debug!(path = %path.display(), %reason, "Discarding cache file");
                doomed.push(path);
            }
        }
    }

    let discarded = doomed.len();
    remove_files(&doomed);

    info!(
        dir = %dir.display(),
        entries = index.len(),
        discarded,
        "Cache directory scanned"
    );

    Ok(ScanReport { index, discarded })
}

/// Returns the header if the file is a live entry, or why it is not.
fn validate<C: Codec>(
    codec: &C,
    path: &Path,
    file_name: &str,
    now: chrono::DateTime<Utc>,
) -> std::result::Result<CacheHeader, String> {
    if !is_entry_file_name(file_name) {
        return Err("not an entry file name".to_string());
    }
    let header = read_header(codec, path).map_err(|e| e.to_string())?;

    if hash_key(&header.key) != file_name {
        return Err(format!("file name does not match key {:?}", header.key));
    }
    if header.is_expired_at(now) {
        return Err("expired".to_string());
    }
    Ok(header)
}

/// Deletes files, ignoring ones that are already gone.
fn remove_files(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to delete discarded cache file");
            }
        }
    }
}
