// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::parse_duration;

/// Command-line arguments for `procgate`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "procgate",
    version,
    about = "Run a command with bounded output, a timeout, and a cap on concurrent subprocesses.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to a config file (TOML).
    ///
    /// If omitted, `procgate.toml` in the current directory is used when it
    /// exists.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Maximum number of concurrently running subprocesses.
    #[arg(long, value_name = "N")]
    pub max_subprocesses: Option<usize>,

    /// Kill the command after this long (e.g. `30`, `30s`, `500ms`).
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Kill the command once stdout or stderr exceeds this many bytes.
    #[arg(long, value_name = "BYTES")]
    pub output_limit: Option<usize>,

    /// Working directory for the command.
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Extra environment variable; may be repeated.
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Text written to the command's stdin.
    #[arg(long, value_name = "TEXT")]
    pub input: Option<String>,

    /// Pass output through as raw bytes instead of decoding it as UTF-8.
    #[arg(long)]
    pub binary: bool,

    /// Let the command write straight to this process's stdout/stderr.
    #[arg(long)]
    pub no_capture: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PROCGATE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Run this string through the shell instead of a program + args.
    #[arg(long, value_name = "COMMAND", conflicts_with = "argv")]
    pub shell: Option<String>,

    /// Program and arguments, run without a shell.
    #[arg(
        value_name = "PROGRAM",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub argv: Vec<String>,
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

fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
