// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `cmdrelay`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cmdrelay",
    version,
    about = "Execute configured commands: local executables or HTTP endpoints.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the command config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Commands.toml")]
    pub config: String,

    /// Append worker trace lines and results to this rotating log file.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CMDRELAY_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Name of the command to execute.
    pub command: String,

    /// Call-time parameters as `key=value` pairs.
    #[arg(value_name = "KEY=VALUE")]
    pub parameters: Vec<String>,
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
