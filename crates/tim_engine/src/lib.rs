//! The Tim template engine facade.
//!
//! Ties the subsystems together behind the three-call contract the host
//! uses: [`Engine::init`] validates the roots and builds the cache,
//! [`Engine::precompile`] replaces the global data store and eagerly
//! compiles the whole template root (optionally starting the watcher),
//! and [`Engine::render`] produces output for a named template composed
//! with an optional named layout.
//!
//! Renders are safe to run in parallel: compiled templates are immutable
//! and shared by reference, each call owns a private context, and the
//! only shared mutable state (the cache and the global store) is behind
//! reader-writer locks with rare writers.

#![warn(missing_docs)]

mod error;
mod globals;
mod options;

pub use error::EngineError;
pub use globals::{GlobalSnapshot, GlobalStore};
pub use options::{
    EngineOptions, EngineStats, PrecompileOptions, PrecompileReport, WatchoutOptions,
};
pub use tim_cache::CacheLevel;
pub use tim_common::Value;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use rayon::prelude::*;
use tim_cache::{ArtifactStore, CacheStore};
use tim_common::ContentHash;
use tim_ir::CompiledTemplate;
use tim_render::{LoadError, RenderContext, TemplateProvider};
use tim_source::SourceResolver;
use tim_watch::{ChangeObserver, WatchConfig, WatchHandle};

/// The template engine.
///
/// Cheap to share: internally one reference-counted state block. All
/// methods take `&self` and are safe to call from multiple threads.
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}

struct EngineInner {
    resolver: SourceResolver,
    cache: CacheStore,
    globals: GlobalStore,
    storage_root: PathBuf,
    watch_allowed: bool,
    compiles: AtomicU64,
    cache_hits: AtomicU64,
    watcher: Mutex<Option<WatchHandle>>,
}

impl Engine {
    /// Initializes an engine over the given roots.
    ///
    /// The template root must exist and be readable. At cache level 2
    /// the storage root is created if missing and must be writable.
    pub fn init(options: EngineOptions) -> Result<Engine, EngineError> {
        let template_root = anchor(&options.base_path, &options.template_root);
        let storage_root = anchor(&options.base_path, &options.storage_root);

        if !template_root.is_dir() {
            return Err(EngineError::Init {
                message: format!(
                    "template root {} does not exist or is not a directory",
                    template_root.display()
                ),
            });
        }
        // Readability probe; a root we cannot list is unusable.
        std::fs::read_dir(&template_root).map_err(|source| EngineError::Io {
            path: template_root.clone(),
            source,
        })?;

        let artifacts = if options.cache_level.persists_to_disk() {
            std::fs::create_dir_all(&storage_root).map_err(|source| EngineError::Io {
                path: storage_root.clone(),
                source,
            })?;
            Some(ArtifactStore::new(&storage_root, env!("CARGO_PKG_VERSION")))
        } else {
            None
        };

        Ok(Engine {
            inner: Arc::new(EngineInner {
                resolver: SourceResolver::new(&template_root),
                cache: CacheStore::new(options.cache_level, artifacts),
                globals: GlobalStore::new(),
                storage_root,
                watch_allowed: options.watch,
                compiles: AtomicU64::new(0),
                cache_hits: AtomicU64::new(0),
                watcher: Mutex::new(None),
            }),
        })
    }

    /// Replaces global data and eagerly compiles the whole template root.
    ///
    /// Eager compilation means first-request latency is not paid by end
    /// users. Broken templates are reported per name rather than
    /// aborting the scan. When the engine was initialized with
    /// `watch: true` and the watchout options allow it, the background
    /// watcher is started here.
    pub fn precompile(
        &self,
        options: PrecompileOptions,
    ) -> Result<PrecompileReport, EngineError> {
        if let Some(data) = options.data {
            self.inner.globals.set(data);
        }

        let names = self
            .inner
            .resolver
            .scan()
            .map_err(EngineError::from_source)?;

        let results: Vec<(String, Result<(), EngineError>)> = names
            .into_par_iter()
            .map(|name| {
                let outcome = self.inner.ensure_compiled(&name).map(|_| ());
                (name, outcome)
            })
            .collect();

        let mut report = PrecompileReport {
            compiled: Vec::new(),
            failed: Vec::new(),
        };
        for (name, outcome) in results {
            match outcome {
                Ok(()) => report.compiled.push(name),
                Err(err) => report.failed.push((name, err)),
            }
        }

        let watchout = options.watchout.unwrap_or_default();
        if self.inner.watch_allowed && watchout.enable {
            self.start_watcher(&watchout);
        }

        Ok(report)
    }

    /// Renders a named template, optionally composed inside a named
    /// layout, against per-call data merged over the global snapshot.
    pub fn render(
        &self,
        template: &str,
        layout: Option<&str>,
        data: Value,
    ) -> Result<String, EngineError> {
        let locals = match data {
            Value::Object(entries) => entries,
            Value::Null => BTreeMap::new(),
            other => {
                return Err(EngineError::TypeMismatch {
                    message: format!("render data must be an object, got {}", other.type_name()),
                })
            }
        };

        let content_template = self.inner.ensure_compiled(template)?;
        let layout_template = match layout {
            Some(name) => Some((name, self.inner.ensure_compiled(name)?)),
            None => None,
        };

        let snapshot = self.inner.globals.snapshot();
        let provider = EngineProvider {
            inner: &self.inner,
        };

        let mut ctx = RenderContext::new(&snapshot.entries, &locals);
        let content_out = tim_render::render_template(
            template,
            &content_template,
            &provider,
            &mut ctx,
            None,
        )
        .map_err(EngineError::from_render)?;

        match layout_template {
            Some((layout_name, layout_template)) => {
                let mut layout_ctx = RenderContext::new(&snapshot.entries, &locals);
                tim_render::render_template(
                    layout_name,
                    &layout_template,
                    &provider,
                    &mut layout_ctx,
                    Some(&content_out),
                )
                .map_err(EngineError::from_render)
            }
            None => Ok(content_out),
        }
    }

    /// Removes the in-memory cache entry for a name.
    ///
    /// The next access recompiles from source (or reloads a matching
    /// level-2 artifact).
    pub fn invalidate(&self, name: &str) {
        self.inner.cache.invalidate(name);
    }

    /// Stops the background watcher, if one is running.
    ///
    /// Call before process exit to release the filesystem watch; also
    /// happens automatically when the engine is dropped.
    pub fn shutdown(&self) {
        let handle = self
            .inner
            .watcher
            .lock()
            .expect("watcher lock poisoned")
            .take();
        if let Some(handle) = handle {
            handle.stop();
        }
    }

    /// Returns `true` if the background watcher is running.
    pub fn is_watching(&self) -> bool {
        self.inner
            .watcher
            .lock()
            .expect("watcher lock poisoned")
            .is_some()
    }

    /// Returns compile/cache-hit counters.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            compiles: self.inner.compiles.load(Ordering::Relaxed),
            cache_hits: self.inner.cache_hits.load(Ordering::Relaxed),
        }
    }

    /// Returns the configured cache level.
    pub fn cache_level(&self) -> CacheLevel {
        self.inner.cache.level()
    }

    fn start_watcher(&self, watchout: &WatchoutOptions) {
        let mut guard = self.inner.watcher.lock().expect("watcher lock poisoned");
        if guard.is_some() {
            return;
        }
        if let Some(port) = watchout.port {
            // Host livereload knob; carried through, not interpreted.
            tracing::debug!("watchout port {port} is handled by the host");
        }
        let config = WatchConfig {
            debounce: Duration::from_millis(watchout.delay_ms),
        };
        let observer = Arc::new(EngineObserver {
            inner: Arc::downgrade(&self.inner),
        });
        match tim_watch::spawn(
            SourceResolver::new(self.inner.resolver.root()),
            config,
            observer,
        ) {
            Ok(handle) => *guard = Some(handle),
            Err(e) => {
                tracing::warn!(
                    "failed to watch template root: {e}; cached templates will serve stale"
                );
            }
        }
    }
}

impl EngineInner {
    /// Returns the compiled template for a name, serving from cache
    /// when possible.
    ///
    /// Miss path: resolve the source, try a matching level-2 artifact,
    /// then compile. A failed compile returns an error without touching
    /// any previously cached entry.
    fn ensure_compiled(&self, name: &str) -> Result<Arc<CompiledTemplate>, EngineError> {
        if let Some(entry) = self.cache.get(name) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(entry);
        }

        let source = self
            .resolver
            .resolve(name)
            .map_err(EngineError::from_source)?;

        if let Some(entry) = self.cache.load_persisted(name, source.fingerprint) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(entry);
        }

        let compiled = tim_compiler::compile(&source)
            .map_err(|e| EngineError::from_compile(name, e))?;
        self.compiles.fetch_add(1, Ordering::Relaxed);

        let compiled = Arc::new(compiled);
        self.cache
            .put(name, Arc::clone(&compiled))
            .map_err(|e| EngineError::from_cache(&self.storage_root, e))?;
        Ok(compiled)
    }
}

/// Render-time include source backed by the engine's cache + compiler.
struct EngineProvider<'a> {
    inner: &'a EngineInner,
}

impl TemplateProvider for EngineProvider<'_> {
    fn load(&self, name: &str) -> Result<Arc<CompiledTemplate>, LoadError> {
        self.inner
            .ensure_compiled(name)
            .map_err(|e| e.to_load_error(name))
    }
}

/// Watcher callback target holding a weak engine reference.
///
/// Weak so that the watcher thread never keeps a shut-down engine
/// alive; once the engine drops, callbacks become no-ops and the
/// watch handle's drop joins the thread.
struct EngineObserver {
    inner: Weak<EngineInner>,
}

impl ChangeObserver for EngineObserver {
    fn active_fingerprint(&self, name: &str) -> Option<ContentHash> {
        self.inner.upgrade()?.cache.entry_fingerprint(name)
    }

    fn invalidated(&self, name: &str, _fingerprint: ContentHash) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        inner.cache.invalidate(name);
        // Opportunistic background recompile. Renders racing this simply
        // compile on demand; they never wait on the watcher.
        match inner.ensure_compiled(name) {
            Ok(_) => tracing::debug!("recompiled `{name}` after change"),
            Err(e) => tracing::warn!("recompile of `{name}` after change failed: {e}"),
        }
    }

    fn removed(&self, name: &str) {
        if let Some(inner) = self.inner.upgrade() {
            inner.cache.invalidate(name);
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn anchor(base: &Option<PathBuf>, root: &Path) -> PathBuf {
    match base {
        Some(base) if root.is_relative() => base.join(root),
        _ => root.to_path_buf(),
    }
}
