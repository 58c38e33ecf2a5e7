//! The closed set of cache levels.

use serde::{Deserialize, Serialize};

/// Cache policy for compiled templates.
///
/// Modeled as a closed enum rather than a raw integer so that behavior
/// stays exhaustive and testable; the raw 0/1/2 form of the init contract
/// converts through [`CacheLevel::from_raw`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheLevel {
    /// Level 0: no caching. Every render recompiles from source, which
    /// guarantees freshness during active authoring.
    None,
    /// Level 1: in-memory cache, invalidated on fingerprint mismatch.
    Memory,
    /// Level 2: in-memory cache backed by persisted on-disk artifacts,
    /// reloaded across process restarts.
    Persistent,
}

impl CacheLevel {
    /// Converts the raw integer of the init contract.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(CacheLevel::None),
            1 => Some(CacheLevel::Memory),
            2 => Some(CacheLevel::Persistent),
            _ => None,
        }
    }

    /// Returns the raw integer form.
    pub fn as_raw(self) -> u8 {
        match self {
            CacheLevel::None => 0,
            CacheLevel::Memory => 1,
            CacheLevel::Persistent => 2,
        }
    }

    /// Returns `true` if compiled templates are kept in memory.
    pub fn caches_in_memory(self) -> bool {
        !matches!(self, CacheLevel::None)
    }

    /// Returns `true` if compiled templates are persisted to disk.
    pub fn persists_to_disk(self) -> bool {
        matches!(self, CacheLevel::Persistent)
    }
}
