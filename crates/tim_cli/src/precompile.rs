//! `tim precompile` — eager compilation of the whole template root.

use std::collections::BTreeMap;
use std::error::Error;
use std::path::Path;

use tim_common::Value;
use tim_engine::{PrecompileOptions, WatchoutOptions};

use crate::{Cli, PrecompileArgs};

/// Runs the `tim precompile` command.
///
/// Compiles every discoverable template (populating the artifact store
/// at cache level 2) and reports per-template failures. Returns exit
/// code 0 when every template compiled, 1 otherwise.
pub fn run(args: &PrecompileArgs, cli: &Cli) -> Result<i32, Box<dyn Error>> {
    let engine = crate::pipeline::init_engine(cli)?;

    let data = match &args.data_file {
        Some(path) => Some(read_globals(path)?),
        None => None,
    };

    let report = engine.precompile(PrecompileOptions {
        data,
        // One-shot command: never leave a watcher behind.
        watchout: Some(WatchoutOptions {
            enable: false,
            ..WatchoutOptions::default()
        }),
    })?;

    if !cli.quiet {
        eprintln!("Compiled {} template(s)", report.compiled.len());
    }
    for (name, err) in &report.failed {
        eprintln!("error: {name}: {err}");
    }

    Ok(if report.is_clean() { 0 } else { 1 })
}

/// Reads the global data file, which must hold a JSON object.
fn read_globals(path: &Path) -> Result<BTreeMap<String, Value>, Box<dyn Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .map_err(|e| format!("invalid JSON in {}: {e}", path.display()))?;
    match value {
        Value::Object(entries) => Ok(entries),
        other => Err(format!(
            "global data in {} must be a JSON object, got {}",
            path.display(),
            other.type_name()
        )
        .into()),
    }
}
