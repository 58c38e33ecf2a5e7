//! Content fingerprinting for cache invalidation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 128-bit content fingerprint computed with XXH3.
///
/// Two sources with the same `ContentHash` are assumed to have identical
/// bytes. The engine uses fingerprints to decide whether a cached compiled
/// template is still valid for the file currently on disk.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(u128);

impl ContentHash {
    /// Computes the fingerprint of a byte slice using XXH3-128.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(xxhash_rust::xxh3::xxh3_128(data))
    }

    /// Returns the fingerprint as a 32-character lowercase hex string.
    ///
    /// This form is embedded in persisted artifact file names, so it must
    /// stay stable across releases.
    pub fn to_hex(self) -> String {
        format!("{:032x}", self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:08x}..)", (self.0 >> 96) as u32)
    }
}
