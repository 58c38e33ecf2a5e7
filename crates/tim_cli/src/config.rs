//! Project configuration parsed from `tim.toml`.

use serde::Deserialize;
use std::path::Path;
use tim_engine::CacheLevel;

/// Errors produced while loading `tim.toml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The path that failed.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML.
    #[error("failed to parse tim.toml: {0}")]
    Parse(String),

    /// `engine.cache_level` is outside the 0..=2 range.
    #[error("invalid cache level {0}: expected 0, 1, or 2")]
    InvalidCacheLevel(u8),
}

/// The top-level project configuration.
#[derive(Debug, Default, Deserialize)]
pub struct TimConfig {
    /// Engine settings.
    #[serde(default)]
    pub engine: EngineSection,
    /// Directory layout.
    #[serde(default)]
    pub paths: PathsSection,
}

/// `[engine]` section.
#[derive(Debug, Deserialize)]
pub struct EngineSection {
    /// Cache level: 0 (off), 1 (memory), or 2 (memory + disk).
    #[serde(default = "default_cache_level")]
    pub cache_level: u8,
    /// Whether the engine may start the template watcher.
    #[serde(default)]
    pub watch: bool,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            cache_level: default_cache_level(),
            watch: false,
        }
    }
}

/// `[paths]` section. Both paths resolve relative to the config file.
#[derive(Debug, Deserialize)]
pub struct PathsSection {
    /// Template source directory.
    #[serde(default = "default_templates")]
    pub templates: String,
    /// Storage directory for persisted compiled artifacts.
    #[serde(default = "default_storage")]
    pub storage: String,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            templates: default_templates(),
            storage: default_storage(),
        }
    }
}

fn default_cache_level() -> u8 {
    1
}

fn default_templates() -> String {
    "templates".to_string()
}

fn default_storage() -> String {
    "storage".to_string()
}

impl TimConfig {
    /// Returns the typed cache level.
    pub fn cache_level(&self) -> Result<CacheLevel, ConfigError> {
        CacheLevel::from_raw(self.engine.cache_level)
            .ok_or(ConfigError::InvalidCacheLevel(self.engine.cache_level))
    }
}

/// Loads the configuration from the given file.
///
/// A missing file yields the defaults so that a bare template directory
/// works without a manifest.
pub fn load_config(path: &Path) -> Result<TimConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("{} not found, using defaults", path.display());
        return Ok(TimConfig::default());
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_config_from_str(&content)
}

/// Parses a configuration from a string. Useful for testing without
/// filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<TimConfig, ConfigError> {
    let config: TimConfig =
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    // Validate the level eagerly so bad configs fail before engine init.
    config.cache_level()?;
    Ok(config)
}
