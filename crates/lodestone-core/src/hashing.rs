//! Stable content hashing for cache keys.
//!
//! Cache keys are derived from semantic strings (question + schema text,
//! embedding input, ...). The digest must be stable across processes and
//! restarts, so this is a plain SHA-256 hex digest.

use sha2::{Digest, Sha256};

/// SHA-256 hex digest of the input string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
