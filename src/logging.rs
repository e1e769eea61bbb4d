// src/logging.rs

//! tracing-subscriber setup. The `--log-level` flag wins; without it the
//! `ASSETPIPE_LOG` environment variable is consulted, and `info` is the
//! fallback.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

const ENV_VAR: &str = "ASSETPIPE_LOG";

/// Install the global subscriber. Call once, from `main`.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let level = cli_level
        .map(Level::from)
        .or_else(|| std::env::var(ENV_VAR).ok().and_then(|v| parse_level(&v)))
        .unwrap_or(Level::INFO);

    fmt().with_max_level(level).with_target(true).init();
    Ok(())
}

fn parse_level(value: &str) -> Option<Level> {
    value.trim().parse().ok()
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}
