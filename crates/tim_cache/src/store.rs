//! The shared in-memory cache of compiled templates.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tim_common::ContentHash;
use tim_ir::CompiledTemplate;

use crate::artifact::ArtifactStore;
use crate::error::CacheError;
use crate::level::CacheLevel;

/// Keyed storage of compiled templates with level-dependent behavior.
///
/// Entries are `Arc`-shared: concurrent readers never block each other,
/// and a replace or invalidate swaps the entry atomically under a brief
/// write lock, so a reader observes the old entry in full or the new one
/// in full, never a partially constructed value. There is no size-based
/// eviction; template sets are small and bounded by the filesystem.
pub struct CacheStore {
    level: CacheLevel,
    entries: RwLock<HashMap<String, Arc<CompiledTemplate>>>,
    artifacts: Option<ArtifactStore>,
}

impl CacheStore {
    /// Creates a store for the given level.
    ///
    /// `artifacts` must be `Some` at [`CacheLevel::Persistent`] and is
    /// ignored at the other levels.
    pub fn new(level: CacheLevel, artifacts: Option<ArtifactStore>) -> Self {
        debug_assert!(
            !level.persists_to_disk() || artifacts.is_some(),
            "persistent level requires an artifact store"
        );
        Self {
            level,
            entries: RwLock::new(HashMap::new()),
            artifacts: if level.persists_to_disk() {
                artifacts
            } else {
                None
            },
        }
    }

    /// Returns the configured cache level.
    pub fn level(&self) -> CacheLevel {
        self.level
    }

    /// Returns the cached entry for a name.
    ///
    /// At level 0 this always returns `None`, forcing recompilation on
    /// every render.
    pub fn get(&self, name: &str) -> Option<Arc<CompiledTemplate>> {
        if !self.level.caches_in_memory() {
            return None;
        }
        self.entries
            .read()
            .expect("cache lock poisoned")
            .get(name)
            .cloned()
    }

    /// Returns the fingerprint of the active entry, if any.
    ///
    /// The watcher compares this against the fingerprint of the file on
    /// disk to decide whether an invalidation is due.
    pub fn entry_fingerprint(&self, name: &str) -> Option<ContentHash> {
        self.entries
            .read()
            .expect("cache lock poisoned")
            .get(name)
            .map(|entry| entry.fingerprint)
    }

    /// Attempts to serve a level-2 on-disk artifact.
    ///
    /// Validated against the current source fingerprint; a stale or
    /// corrupt artifact is a miss. A hit installs the entry in memory.
    pub fn load_persisted(
        &self,
        name: &str,
        fingerprint: ContentHash,
    ) -> Option<Arc<CompiledTemplate>> {
        let artifacts = self.artifacts.as_ref()?;
        let template = Arc::new(artifacts.read(name, fingerprint)?);
        self.entries
            .write()
            .expect("cache lock poisoned")
            .insert(name.to_string(), Arc::clone(&template));
        Some(template)
    }

    /// Inserts or wholesale-replaces the entry for a name.
    ///
    /// At level 0 this is a no-op. At level 2 the compiled template is
    /// additionally serialized under the storage root; if that write
    /// fails the in-memory entry is still installed and the error is
    /// returned to the caller.
    pub fn put(
        &self,
        name: &str,
        template: Arc<CompiledTemplate>,
    ) -> Result<(), CacheError> {
        if !self.level.caches_in_memory() {
            return Ok(());
        }
        self.entries
            .write()
            .expect("cache lock poisoned")
            .insert(name.to_string(), Arc::clone(&template));
        if let Some(artifacts) = &self.artifacts {
            artifacts.write(name, &template)?;
        }
        Ok(())
    }

    /// Removes the in-memory entry for a name.
    ///
    /// Storage artifacts are left in place; the next successful compile
    /// supersedes them.
    pub fn invalidate(&self, name: &str) {
        self.entries
            .write()
            .expect("cache lock poisoned")
            .remove(name);
    }

    /// Returns the number of in-memory entries.
    pub fn len(&self) -> usize {
        self.entries.read().expect("cache lock poisoned").len()
    }

    /// Returns `true` if no entries are cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
