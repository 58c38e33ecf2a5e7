//! Shared command plumbing: configuration to initialized engine.

use std::error::Error;
use std::path::Path;

use tim_engine::{Engine, EngineOptions};

use crate::config::load_config;
use crate::Cli;

/// Initializes an engine from the project configuration.
///
/// Roots resolve relative to the config file's directory; the watcher is
/// never started from one-shot commands.
pub(crate) fn init_engine(cli: &Cli) -> Result<Engine, Box<dyn Error>> {
    let config = load_config(&cli.config)?;
    let base = cli
        .config
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf);

    let mut options = EngineOptions::new(&config.paths.templates, &config.paths.storage);
    options.base_path = base;
    options.watch = false;
    options.cache_level = config.cache_level()?;
    Ok(Engine::init(options)?)
}
