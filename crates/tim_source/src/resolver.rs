//! Logical name to source path resolution under the template root.

use crate::error::SourceError;
use crate::template_source::TemplateSource;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// File extension appended to logical template names during resolution.
pub const TEMPLATE_EXTENSION: &str = "tim";

/// Resolves logical template names to sources under a fixed root.
///
/// Names are identifiers without extension, using `/` as the separator for
/// templates in subdirectories (`partials/header`). Names that are empty,
/// absolute, or contain `.`/`..` components are rejected before touching
/// the filesystem, so a resolved path can never escape the root.
pub struct SourceResolver {
    root: PathBuf,
}

impl SourceResolver {
    /// Creates a resolver rooted at the given template directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the template root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a logical name to a loaded [`TemplateSource`].
    pub fn resolve(&self, name: &str) -> Result<TemplateSource, SourceError> {
        let path = self.source_path(name)?;
        let text = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                SourceError::NotFound {
                    name: name.to_string(),
                }
            } else {
                SourceError::Io { path: path.clone(), source: e }
            }
        })?;
        Ok(TemplateSource::new(name, path, text))
    }

    /// Returns the path a logical name resolves to, without reading it.
    pub fn source_path(&self, name: &str) -> Result<PathBuf, SourceError> {
        validate_name(name)?;
        Ok(self
            .root
            .join(format!("{name}.{TEMPLATE_EXTENSION}")))
    }

    /// Maps a filesystem path back to the logical name it resolves from.
    ///
    /// Returns `None` for paths outside the root or without the template
    /// extension. Used by the watcher to translate change events.
    pub fn name_for_path(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        if rel.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXTENSION) {
            return None;
        }
        let stem = rel.with_extension("");
        let mut parts = Vec::new();
        for component in stem.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_str()?.to_string()),
                _ => return None,
            }
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        }
    }

    /// Enumerates every template name under the root, sorted.
    ///
    /// Walks the root recursively and collects files with the template
    /// extension. Sorted output keeps precompile reports deterministic.
    pub fn scan(&self) -> Result<Vec<String>, SourceError> {
        let mut names = Vec::new();
        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let entries = std::fs::read_dir(&dir).map_err(|e| SourceError::Io {
                path: dir.clone(),
                source: e,
            })?;
            for entry in entries {
                let entry = entry.map_err(|e| SourceError::Io {
                    path: dir.clone(),
                    source: e,
                })?;
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                } else if let Some(name) = self.name_for_path(&path) {
                    names.push(name);
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Rejects names that are empty or could resolve outside the root.
fn validate_name(name: &str) -> Result<(), SourceError> {
    let invalid = || SourceError::InvalidName {
        name: name.to_string(),
    };
    if name.is_empty() || name.contains('\\') {
        return Err(invalid());
    }
    let path = Path::new(name);
    if path.is_absolute() {
        return Err(invalid());
    }
    for component in path.components() {
        match component {
            Component::Normal(_) => {}
            _ => return Err(invalid()),
        }
    }
    Ok(())
}
