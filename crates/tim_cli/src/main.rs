//! Tim CLI — command-line surface of the Tim template engine.
//!
//! Provides `tim precompile` for eagerly compiling every template under
//! the project's template root (populating the level-2 artifact store),
//! and `tim render` for rendering a named template, optionally inside a
//! layout, to stdout.

#![warn(missing_docs)]

mod config;
mod pipeline;
mod precompile;
mod render;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

/// Tim — a filesystem-backed template engine.
#[derive(Parser, Debug)]
#[command(name = "tim", version, about = "Tim template engine")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the project's `tim.toml`.
    #[arg(long, global = true, default_value = "tim.toml")]
    pub config: PathBuf,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile every template under the template root.
    Precompile(PrecompileArgs),
    /// Render a template to stdout.
    Render(RenderArgs),
}

/// Arguments for `tim precompile`.
#[derive(Parser, Debug)]
pub struct PrecompileArgs {
    /// JSON file with global data made available to every render.
    #[arg(long)]
    pub data_file: Option<PathBuf>,
}

/// Arguments for `tim render`.
#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Logical template name (no extension), e.g. `index`.
    pub template: String,

    /// Layout template to compose the output into.
    #[arg(short, long)]
    pub layout: Option<String>,

    /// Inline JSON render data.
    #[arg(long, conflicts_with = "data_file")]
    pub data: Option<String>,

    /// JSON file with render data.
    #[arg(long)]
    pub data_file: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    let result = match &cli.command {
        Command::Precompile(args) => precompile::run(args, &cli),
        Command::Render(args) => render::run(args, &cli),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

fn init_tracing(quiet: bool, verbose: bool) {
    let default = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
