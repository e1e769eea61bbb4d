// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! The first positional argument names the task to run; with no task,
//! the default series (build, then watch + serve) runs.

use clap::{Parser, ValueEnum};

use crate::tasks::TaskKind;

/// Command-line arguments for `assetpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetpipe",
    version,
    about = "Build, watch, serve and package a static front-end from its sources.",
    long_about = None
)]
pub struct CliArgs {
    /// Task to run.
    #[arg(value_enum, default_value_t = TaskKind::Default)]
    pub task: TaskKind,

    /// Project root containing `src/` (and receiving `build/` and `zip/`).
    #[arg(long, value_name = "PATH", default_value = ".")]
    pub root: String,

    /// Disable the newer-file skip and incremental template compile.
    #[arg(long)]
    pub no_cache: bool,

    /// Production mode: strip debug statements, compact sprite output.
    #[arg(long)]
    pub production: bool,

    /// Escalate compile/lint errors to hard failures (non-zero exit).
    #[arg(long)]
    pub throw_errors: bool,

    /// Serve HTML extension-free (`/about` resolves `about.html`).
    #[arg(long)]
    pub no_html_ext: bool,

    /// Dev server port.
    #[arg(long, value_name = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
