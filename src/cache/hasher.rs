//! Key Hasher Module
//!
//! Maps cache keys to fixed-length, filesystem-safe entry file names.

use sha2::{Digest, Sha256};

/// Number of digest bytes kept for the file name (128 bits).
const DIGEST_BYTES: usize = 16;

/// Length of an entry file name in hex characters.
pub const HASHED_KEY_LEN: usize = DIGEST_BYTES * 2;

// == Hash Key ==
/// Returns the lowercase hex digest used as the entry file name for `key`.
pub fn hash_key(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    hex::encode(&digest[..DIGEST_BYTES])
}

/// Returns true if `name` has the shape of an entry file name.
pub fn is_entry_file_name(name: &str) -> bool {
    name.len() == HASHED_KEY_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
