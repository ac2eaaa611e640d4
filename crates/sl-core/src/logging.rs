//! Tracing subscriber setup for the sightline binary.
//!
//! # Priority (highest to lowest)
//!
//! 1. `SIGHTLINE_LOG` env var (per-target directives, e.g. `sl_store=debug,info`)
//! 2. `RUST_LOG` env var
//! 3. CLI flags (`-v` → debug, `-q` → error)
//! 4. Default level: `info`
//!
//! Logs always go to stderr so command output on stdout stays parseable.

use clap::ValueEnum;
use tracing::Level;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const ENV_LOG: &str = "SIGHTLINE_LOG";

/// Verbosity level derived from CLI flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    /// Verbose wins when both flags are given.
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if verbose {
            Self::Verbose
        } else if quiet {
            Self::Quiet
        } else {
            Self::Normal
        }
    }

    pub fn default_level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
        }
    }
}

/// Log line encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Install the global subscriber. Returns false if one was already set.
pub fn init_subscriber(verbosity: Verbosity, format: LogFormat) -> bool {
    let filter = build_env_filter(verbosity, |key| std::env::var(key).ok());

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_target(true),
            )
            .try_init()
            .is_ok(),
        LogFormat::Text => {
            let use_ansi = std::io::IsTerminal::is_terminal(&std::io::stderr());
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_ansi(use_ansi)
                        .with_target(true),
                )
                .try_init()
                .is_ok()
        }
    }
}

/// Unparseable directives fall through to the next source.
fn build_env_filter<F>(verbosity: Verbosity, env: F) -> EnvFilter
where
    F: Fn(&str) -> Option<String>,
{
    for key in [ENV_LOG, "RUST_LOG"] {
        if let Some(filter) = env(key).and_then(|d| EnvFilter::try_new(d).ok()) {
            return filter;
        }
    }
    EnvFilter::new(verbosity.default_level().as_str())
}
