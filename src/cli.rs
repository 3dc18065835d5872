// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

use crate::types::RunMethod;

/// Command-line arguments for `deepcheck`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "deepcheck",
    version,
    about = "Run stepped, latency-budgeted checks and record their results.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML). Defaults to `Deepcheck.toml`.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DEEPCHECK_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print configured checks and their steps.
    List,

    /// Run one check now.
    Run {
        /// Check name as configured under `[check.<name>]`.
        name: String,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Recorded with the run; a scheduler should pass `scheduled`.
        #[arg(long, value_name = "METHOD", default_value = "manual")]
        method: RunMethod,
    },

    /// Run every configured check concurrently.
    RunAll {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        #[arg(long, value_name = "METHOD", default_value = "manual")]
        method: RunMethod,
    },

    /// Show stored runs, newest first.
    History {
        /// Only runs of this check.
        #[arg(long, value_name = "NAME")]
        check: Option<String>,

        /// Page size (default 100, at most 1000).
        #[arg(long, default_value_t = 0)]
        take: usize,

        #[arg(long, default_value_t = 0)]
        skip: usize,

        /// Only runs with a failed step, with the first failure reason.
        #[arg(long)]
        failed: bool,
    },

    /// Show the latest run of every check and the recent history of each step.
    Status {
        /// How many recent records to show per step.
        #[arg(long, value_name = "N", default_value_t = 10)]
        steps: usize,
    },

    /// Drop stored runs older than the `[retention]` limits.
    Prune,
}

/// How run results are printed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
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
