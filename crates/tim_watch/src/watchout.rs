//! The watcher thread: notify events to debounced invalidations.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tim_common::ContentHash;
use tim_source::SourceResolver;

/// How often the thread wakes to check the shutdown flag while idle.
const IDLE_POLL: Duration = Duration::from_millis(200);

/// Watcher configuration.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Debounce window: bursts of writes to the same file within this
    /// window collapse to one invalidation.
    pub debounce: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
        }
    }
}

/// Receiver of watcher findings.
///
/// The cache owner implements this: `active_fingerprint` exposes the
/// fingerprint the cache currently holds, and `invalidated`/`removed`
/// are called from the watcher thread when the file on disk disagrees.
pub trait ChangeObserver: Send + Sync + 'static {
    /// The fingerprint of the currently cached entry, if any.
    fn active_fingerprint(&self, name: &str) -> Option<ContentHash>;

    /// The file changed and its fingerprint differs from the cached one.
    fn invalidated(&self, name: &str, fingerprint: ContentHash);

    /// The file is gone (deleted or renamed away).
    fn removed(&self, name: &str);
}

/// Handle to a running watcher. Stops the background thread on
/// [`stop`](WatchHandle::stop) or drop.
pub struct WatchHandle {
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl WatchHandle {
    /// Signals the watcher thread to stop and waits for it to finish.
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

/// Starts watching the template root in a background thread.
///
/// Returns an error only if the watch cannot be established at all;
/// the caller is expected to log that as a warning and continue without
/// freshness, not to fail.
pub fn spawn(
    resolver: SourceResolver,
    config: WatchConfig,
    observer: Arc<dyn ChangeObserver>,
) -> Result<WatchHandle, notify::Error> {
    // Backends report canonical paths; watch and match against the
    // canonical root so symlinked roots (e.g. temp dirs) still resolve.
    let root = resolver
        .root()
        .canonicalize()
        .unwrap_or_else(|_| resolver.root().to_path_buf());
    let resolver = SourceResolver::new(&root);

    let (tx, rx) = mpsc::channel::<notify::Result<notify::Event>>();
    let mut watcher = notify::recommended_watcher(move |res| {
        let _ = tx.send(res);
    })?;
    watcher.watch(&root, RecursiveMode::Recursive)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let thread_shutdown = Arc::clone(&shutdown);
    let thread = std::thread::Builder::new()
        .name("tim-watchout".to_string())
        .spawn(move || {
            run_loop(watcher, rx, resolver, config, observer, thread_shutdown);
        })
        .expect("failed to spawn watcher thread");

    Ok(WatchHandle {
        shutdown,
        thread: Some(thread),
    })
}

fn run_loop(
    // Owned here so the OS watch stays registered for the thread's lifetime.
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<notify::Result<notify::Event>>,
    resolver: SourceResolver,
    config: WatchConfig,
    observer: Arc<dyn ChangeObserver>,
    shutdown: Arc<AtomicBool>,
) {
    while !shutdown.load(Ordering::Relaxed) {
        match rx.recv_timeout(IDLE_POLL) {
            Ok(first) => {
                let mut pending = BTreeSet::new();
                collect_paths(first, &mut pending);

                // Debounce: keep draining until the root goes quiet.
                loop {
                    match rx.recv_timeout(config.debounce) {
                        Ok(event) => collect_paths(event, &mut pending),
                        Err(RecvTimeoutError::Timeout) => break,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }

                for path in pending {
                    process_path(&resolver, &observer, &path);
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Extracts affected paths from one notify event.
fn collect_paths(event: notify::Result<notify::Event>, pending: &mut BTreeSet<PathBuf>) {
    match event {
        Ok(event) => {
            if matches!(
                event.kind,
                notify::EventKind::Create(_)
                    | notify::EventKind::Modify(_)
                    | notify::EventKind::Remove(_)
            ) {
                pending.extend(event.paths);
            }
        }
        Err(e) => {
            tracing::warn!("template watch error: {e}");
        }
    }
}

/// Rehashes one changed path and notifies the observer if it matters.
fn process_path(resolver: &SourceResolver, observer: &Arc<dyn ChangeObserver>, path: &Path) {
    // Paths without the template extension (editor temp files, other
    // assets) resolve to no name and are ignored.
    let Some(name) = resolver.name_for_path(path) else {
        return;
    };

    match std::fs::read(path) {
        Ok(bytes) => {
            let fingerprint = ContentHash::from_bytes(&bytes);
            match observer.active_fingerprint(&name) {
                Some(active) if active == fingerprint => {
                    tracing::debug!("`{name}` unchanged after event, keeping cache entry");
                }
                Some(_) => {
                    tracing::debug!("`{name}` changed, invalidating");
                    observer.invalidated(&name, fingerprint);
                }
                None => {
                    tracing::debug!("`{name}` changed but is not cached, ignoring");
                }
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            observer.removed(&name);
        }
        Err(e) => {
            // Unreadable but present: stale-serves-until-next-check.
            tracing::warn!("failed to rehash `{name}`: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Instant;

    #[derive(Default)]
    struct RecordingObserver {
        active: Mutex<Option<ContentHash>>,
        invalidations: Mutex<Vec<(String, ContentHash)>>,
        removals: Mutex<Vec<String>>,
    }

    impl ChangeObserver for RecordingObserver {
        fn active_fingerprint(&self, _name: &str) -> Option<ContentHash> {
            *self.active.lock().unwrap()
        }

        fn invalidated(&self, name: &str, fingerprint: ContentHash) {
            self.invalidations
                .lock()
                .unwrap()
                .push((name.to_string(), fingerprint));
        }

        fn removed(&self, name: &str) {
            self.removals.lock().unwrap().push(name.to_string());
        }
    }

    fn wait_until(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if check() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(25));
        }
        false
    }

    fn short_config() -> WatchConfig {
        WatchConfig {
            debounce: Duration::from_millis(50),
        }
    }

    #[test]
    fn edit_is_observed_after_debounce() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.tim");
        std::fs::write(&path, "old body").unwrap();

        let observer = Arc::new(RecordingObserver::default());
        *observer.active.lock().unwrap() = Some(ContentHash::from_bytes(b"old body"));

        let handle = spawn(
            SourceResolver::new(dir.path()),
            short_config(),
            Arc::clone(&observer) as Arc<dyn ChangeObserver>,
        )
        .unwrap();

        std::fs::write(&path, "new body").unwrap();

        let seen = wait_until(Duration::from_secs(5), || {
            !observer.invalidations.lock().unwrap().is_empty()
        });
        handle.stop();

        assert!(seen, "edit was never observed");
        let invalidations = observer.invalidations.lock().unwrap();
        assert_eq!(invalidations[0].0, "page");
        assert_eq!(invalidations[0].1, ContentHash::from_bytes(b"new body"));
    }

    #[test]
    fn unchanged_rewrite_is_not_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.tim");
        std::fs::write(&path, "same body").unwrap();

        let observer = Arc::new(RecordingObserver::default());
        *observer.active.lock().unwrap() = Some(ContentHash::from_bytes(b"same body"));

        let handle = spawn(
            SourceResolver::new(dir.path()),
            short_config(),
            Arc::clone(&observer) as Arc<dyn ChangeObserver>,
        )
        .unwrap();

        // Rewrite with identical bytes: fingerprint is equal, no report.
        std::fs::write(&path, "same body").unwrap();
        let seen = wait_until(Duration::from_millis(800), || {
            !observer.invalidations.lock().unwrap().is_empty()
        });
        handle.stop();
        assert!(!seen, "identical rewrite should not invalidate");
    }

    #[test]
    fn removal_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.tim");
        std::fs::write(&path, "body").unwrap();

        let observer = Arc::new(RecordingObserver::default());
        let handle = spawn(
            SourceResolver::new(dir.path()),
            short_config(),
            Arc::clone(&observer) as Arc<dyn ChangeObserver>,
        )
        .unwrap();

        std::fs::remove_file(&path).unwrap();

        let seen = wait_until(Duration::from_secs(5), || {
            !observer.removals.lock().unwrap().is_empty()
        });
        handle.stop();

        assert!(seen, "removal was never observed");
        assert_eq!(observer.removals.lock().unwrap()[0], "gone");
    }

    #[test]
    fn non_template_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let observer = Arc::new(RecordingObserver::default());
        *observer.active.lock().unwrap() = Some(ContentHash::from_bytes(b"x"));

        let handle = spawn(
            SourceResolver::new(dir.path()),
            short_config(),
            Arc::clone(&observer) as Arc<dyn ChangeObserver>,
        )
        .unwrap();

        std::fs::write(dir.path().join("notes.txt"), "not a template").unwrap();
        let seen = wait_until(Duration::from_millis(800), || {
            !observer.invalidations.lock().unwrap().is_empty()
        });
        handle.stop();
        assert!(!seen, "non-template file should be ignored");
    }

    #[test]
    fn stop_joins_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let observer = Arc::new(RecordingObserver::default());
        let handle = spawn(
            SourceResolver::new(dir.path()),
            short_config(),
            observer as Arc<dyn ChangeObserver>,
        )
        .unwrap();
        handle.stop();
    }
}
