// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `procward`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "procward",
    version,
    about = "Run a command under a watchdog that kills it when a timeout elapses.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to a TOML config file with an `[exec]` section.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Watchdog timeout, e.g. `500ms`, `3s`, `2m`, or `infinite`.
    #[arg(short, long, value_name = "DURATION")]
    pub timeout: Option<String>,

    /// Exit code counted as success. Repeatable; default is 0 only.
    #[arg(long = "ok-code", value_name = "CODE", allow_negative_numbers = true)]
    pub ok_codes: Vec<i32>,

    /// Do not check the exit code at all.
    #[arg(long, conflicts_with = "ok_codes")]
    pub any_exit_code: bool,

    /// How long to wait for output to drain after the process exits.
    #[arg(long, value_name = "DURATION")]
    pub grace: Option<String>,

    /// Only kill the direct child on timeout, not its process group.
    #[arg(long)]
    pub no_kill_tree: bool,

    /// Working directory for the command.
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PROCWARD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Program to run.
    #[arg(required = true)]
    pub program: String,

    /// Arguments passed to the program.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
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
