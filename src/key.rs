use crate::options::TransformOptions;
use sha2::{Digest, Sha256};
use std::fmt;

/// A content-addressed cache key.
///
/// Derived as a SHA-256 digest over a canonical encoding of the effective
/// transform options followed by the raw body bytes, then hex-encoded.
/// Identical body and options always derive the same key, across calls and
/// across process restarts; differing options derive different keys even
/// for identical bodies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key for a body under the given options.
    pub fn derive(options: &TransformOptions, body: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        options.hash_into(&mut hasher);
        hasher.update(body);
        Self(hex::encode(hasher.finalize()))
    }

    /// Returns the hex-digest text, which is also the durable store's
    /// file name for this entry.
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
