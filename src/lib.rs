// src/lib.rs

//! Run external commands to completion with bounded output, a wall-clock
//! timeout, and a cap on how many children run at once.
//!
//! ```no_run
//! # async fn demo() -> procgate::errors::Result<()> {
//! use std::time::Duration;
//! use procgate::{ExecConfig, ExecRequest, Executor};
//!
//! let executor = Executor::new(ExecConfig::default());
//! let result = executor
//!     .execute(ExecRequest::exec(["echo", "hi"]).timeout(Duration::from_secs(5)))
//!     .await?;
//! assert_eq!(result.stdout_text(), Some("hi\n"));
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::io::Write;

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::cli::CliArgs;
use crate::config::{ConfigFile, default_config_path, load_and_validate};
use crate::errors::ProcgateError;

pub use crate::exec::{ExecConfig, ExecRequest, Execute, Executor};
pub use crate::types::{CapturedOutput, CommandSpec, ExecResult, OutputMode};

/// Exit status used when the command timed out (matches coreutils `timeout`).
pub const EXIT_TIMEOUT: i32 = 124;
/// Exit status used when the command could not be started.
pub const EXIT_SPAWN_FAILED: i32 = 127;

/// High-level entry point used by `main.rs`.
///
/// Loads config, builds the executor and request, runs it, and returns the
/// exit status the `procgate` process should use.
pub async fn run(args: CliArgs) -> Result<i32> {
    let cfg = load_config(&args)?;

    let mut exec_config = cfg.exec_config();
    if let Some(max) = args.max_subprocesses {
        exec_config.max_subprocesses = max;
    }
    let executor = Executor::new(exec_config);

    let request = request_from_args(&args, &cfg)?;

    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    run_request(&executor, request, &mut stdout, &mut stderr).await
}

/// Explicit `--config` must exist; the default path is optional.
fn load_config(args: &CliArgs) -> Result<ConfigFile> {
    if let Some(path) = &args.config {
        return load_and_validate(path)
            .with_context(|| format!("loading config from {}", path.display()));
    }

    let path = default_config_path();
    if path.is_file() {
        debug!(path = %path.display(), "using default config file");
        return load_and_validate(&path)
            .with_context(|| format!("loading config from {}", path.display()));
    }

    Ok(ConfigFile::default())
}

/// Build the request described by the CLI flags, falling back to config
/// defaults for timeout and output limit.
pub fn request_from_args(args: &CliArgs, cfg: &ConfigFile) -> Result<ExecRequest> {
    let mut request = match (&args.shell, args.argv.is_empty()) {
        (Some(cmd), _) => ExecRequest::shell(cmd.clone()),
        (None, false) => ExecRequest::exec(args.argv.iter().cloned()),
        (None, true) => bail!("no command given; pass --shell <COMMAND> or -- <PROGRAM> [ARGS...]"),
    };

    request = request
        .capture_output(!args.no_capture)
        .envs(args.env.iter().cloned());

    if args.binary {
        request = request.binary();
    }
    if let Some(input) = &args.input {
        request = request.input(input.as_str());
    }
    if let Some(dir) = &args.cwd {
        request = request.cwd(dir);
    }
    if let Some(timeout) = args.timeout.or(cfg.timeout) {
        request = request.timeout(timeout);
    }
    if let Some(limit) = args.output_limit.or(cfg.output_limit) {
        request = request.output_limit(limit);
    }

    Ok(request)
}

/// Run one request and copy its captured output to `out`/`err`.
///
/// Returns the child's exit code (signal deaths map to `128 + signal`),
/// [`EXIT_TIMEOUT`] on timeout, or [`EXIT_SPAWN_FAILED`] if it never started.
pub async fn run_request<E, O, W>(
    executor: &E,
    request: ExecRequest,
    out: &mut O,
    err: &mut W,
) -> Result<i32>
where
    E: Execute + ?Sized,
    O: Write,
    W: Write,
{
    match executor.execute(request).await {
        Ok(result) => {
            out.write_all(result.stdout_bytes())?;
            err.write_all(result.stderr_bytes())?;
            out.flush()?;
            err.flush()?;
            Ok(process_exit_code(result.returncode))
        }
        Err(e @ ProcgateError::Timeout { .. }) => {
            writeln!(err, "procgate: {e}")?;
            Ok(EXIT_TIMEOUT)
        }
        Err(e @ ProcgateError::Spawn { .. }) => {
            writeln!(err, "procgate: {e}")?;
            Ok(EXIT_SPAWN_FAILED)
        }
        Err(e) => Err(e.into()),
    }
}

fn process_exit_code(returncode: i32) -> i32 {
    if returncode < 0 {
        128 - returncode
    } else {
        returncode
    }
}
