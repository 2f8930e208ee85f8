// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Directory roots and the build command live in the config file; the CLI
//! only selects that file and the run mode.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `distwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "distwatch",
    version,
    about = "Keep a build output tree in sync with its sources while supervising a watch-mode build tool.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// If omitted, `Distwatch.toml` in the current directory is used when it
    /// exists; otherwise built-in defaults apply.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DISTWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the resolved roots and command, then exit.
    #[arg(long)]
    pub dry_run: bool,

    /// Reconcile every output root against the sources once, invalidate the
    /// incremental cache, then exit. No watcher, no build process.
    #[arg(long, conflicts_with = "dry_run")]
    pub clean: bool,
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
