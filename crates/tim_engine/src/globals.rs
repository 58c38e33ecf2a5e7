//! The process-wide global data store.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tim_common::Value;

/// One immutable generation of global data.
///
/// Renders hold an `Arc` to the snapshot they started with, so a
/// concurrent [`GlobalStore::set`] can never produce a context assembled
/// from two different generations.
#[derive(Debug)]
pub struct GlobalSnapshot {
    /// Monotonic generation counter, bumped on every replacement.
    pub version: u64,
    /// The global entries, merged underneath per-call render data.
    pub entries: BTreeMap<String, Value>,
}

/// Holder of the current global snapshot.
///
/// `set` replaces the snapshot wholesale: a second call fully supersedes
/// the first, it does not deep-merge with it.
pub struct GlobalStore {
    current: RwLock<Arc<GlobalSnapshot>>,
}

impl GlobalStore {
    /// Creates a store with an empty generation-zero snapshot.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(GlobalSnapshot {
                version: 0,
                entries: BTreeMap::new(),
            })),
        }
    }

    /// Replaces the snapshot wholesale. Last write wins.
    pub fn set(&self, entries: BTreeMap<String, Value>) {
        let mut guard = self.current.write().expect("globals lock poisoned");
        let version = guard.version + 1;
        *guard = Arc::new(GlobalSnapshot { version, entries });
    }

    /// Returns the current snapshot for a render call.
    pub fn snapshot(&self) -> Arc<GlobalSnapshot> {
        Arc::clone(&self.current.read().expect("globals lock poisoned"))
    }
}

impl Default for GlobalStore {
    fn default() -> Self {
        Self::new()
    }
}
