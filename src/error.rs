//! Error types for the file cache
//!
//! Provides unified error handling using thiserror.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the file cache.
///
/// Not-found and expired lookups are not errors; `get` reports them as `Ok(None)`.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Empty keys are rejected before touching the index or the filesystem
    #[error("Cache key cannot be empty")]
    EmptyKey,

    /// Entry file could not be decoded or carries an invalid header
    #[error("Cache file corrupted: {0}")]
    Corrupted(String),

    /// Entry file decoded cleanly but belongs to a different key
    #[error("Cache key mismatch: expected {expected:?}, found {found:?}")]
    KeyMismatch { expected: String, found: String },

    /// Header or value could not be serialized
    #[error("Failed to encode entry: {0}")]
    Encode(String),

    /// Underlying filesystem failure
    #[error("I/O error while trying to {op} {path}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CacheError {
    /// Wraps an I/O error with the operation and path it came from.
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        CacheError::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Fills in the path of an I/O error raised on an anonymous stream.
    pub(crate) fn at_path(self, at: &Path) -> Self {
        match self {
            CacheError::Io { op, path, source } if path.as_os_str().is_empty() => {
                CacheError::io(op, at, source)
            }
            other => other,
        }
    }

    /// Returns true if this error means the on-disk entry can no longer be
    /// trusted and its index entry should be dropped.
    pub fn is_self_healing(&self) -> bool {
        match self {
            CacheError::Corrupted(_) | CacheError::KeyMismatch { .. } => true,
            CacheError::Io { source, .. } => source.kind() == io::ErrorKind::NotFound,
            CacheError::EmptyKey | CacheError::Encode(_) => false,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the file cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_self_healing() {
        let err = CacheError::io(
            "open",
            "/tmp/x",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_self_healing());
    }

    #[test]
    fn test_permission_denied_is_not_self_healing() {
        let err = CacheError::io(
            "open",
            "/tmp/x",
            io::Error::new(io::ErrorKind::PermissionDenied, "nope"),
        );
        assert!(!err.is_self_healing());
    }

    #[test]
    fn test_corruption_variants_are_self_healing() {
        assert!(CacheError::Corrupted("bad header".to_string()).is_self_healing());
        assert!(CacheError::KeyMismatch {
            expected: "a".to_string(),
            found: "b".to_string(),
        }
        .is_self_healing());
        assert!(!CacheError::EmptyKey.is_self_healing());
    }

    #[test]
    fn test_io_error_message_includes_context() {
        let err = CacheError::io(
            "rename",
            "/tmp/cache/abc",
            io::Error::new(io::ErrorKind::Other, "disk full"),
        );
        let msg = err.to_string();
        assert!(msg.contains("rename"));
        assert!(msg.contains("/tmp/cache/abc"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn test_at_path_fills_only_missing_paths() {
        let err = CacheError::io(
            "read entry",
            PathBuf::new(),
            io::Error::new(io::ErrorKind::Other, "device error"),
        )
        .at_path(Path::new("/tmp/cache/abc"));
        assert!(matches!(&err, CacheError::Io { path, .. } if path == Path::new("/tmp/cache/abc")));

        let err = CacheError::io(
            "open",
            "/tmp/first",
            io::Error::new(io::ErrorKind::Other, "device error"),
        )
        .at_path(Path::new("/tmp/second"));
        assert!(matches!(&err, CacheError::Io { path, .. } if path == Path::new("/tmp/first")));

        let err = CacheError::Corrupted("bad".to_string()).at_path(Path::new("/tmp/x"));
        assert!(matches!(err, CacheError::Corrupted(_)));
    }
}
