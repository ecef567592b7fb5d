// src/exec/launcher.rs

//! Child process creation and stdin feeding.
//!
//! This is the only place that touches `tokio::process::Command`.

use std::io::ErrorKind;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::debug;

use crate::errors::{ProcgateError, Result};
use crate::exec::request::ExecRequest;
use crate::types::CommandSpec;

/// A freshly spawned child with its pipe endpoints split out.
///
/// `stdout`/`stderr` are `None` when output is not captured (the child
/// inherited the parent's streams).
#[derive(Debug)]
pub struct ProcessHandle {
    pub child: Child,
    pub stdin: Option<ChildStdin>,
    pub stdout: Option<ChildStdout>,
    pub stderr: Option<ChildStderr>,
}

fn build_command(spec: &CommandSpec) -> Command {
    match spec {
        CommandSpec::Shell(cmd) => {
            if cfg!(windows) {
                let mut c = Command::new("cmd");
                c.arg("/C").arg(cmd);
                c
            } else {
                let mut c = Command::new("sh");
                c.arg("-c").arg(cmd);
                c
            }
        }
        CommandSpec::Exec { program, args } => {
            let mut c = Command::new(program);
            c.args(args);
            c
        }
    }
}

/// Spawn the child described by `request`.
///
/// Stdin is always piped. Stdout/stderr are piped when capturing and
/// inherited otherwise. Extra env vars are layered over the parent
/// environment, which the child inherits by default.
pub fn spawn(request: &ExecRequest) -> Result<ProcessHandle> {
    let mut cmd = build_command(&request.command);

    cmd.envs(&request.env).stdin(Stdio::piped()).kill_on_drop(true);

    if let Some(dir) = &request.cwd {
        cmd.current_dir(dir);
    }

    if request.capture_output {
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    } else {
        cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    }

    let mut child = cmd.spawn().map_err(|source| ProcgateError::Spawn {
        command: request.command.display_string(),
        source,
    })?;

    debug!(
        command = %request.command,
        pid = child.id(),
        capture = request.capture_output,
        "spawned child process"
    );

    Ok(ProcessHandle {
        stdin: child.stdin.take(),
        stdout: child.stdout.take(),
        stderr: child.stderr.take(),
        child,
    })
}

/// Write `input` (if any) to the child's stdin, flush, and close it.
///
/// With no input the pipe is closed straight away so the child sees EOF.
/// A broken pipe means the child stopped reading; that is not treated as a
/// failure of the invocation.
pub async fn feed_stdin(stdin: Option<ChildStdin>, input: Option<&[u8]>) -> Result<()> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };

    if let Some(input) = input {
        let written = async {
            stdin.write_all(input).await?;
            stdin.flush().await?;
            stdin.shutdown().await
        }
        .await;

        match written {
            Ok(()) => debug!(bytes = input.len(), "wrote stdin payload"),
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                debug!(error = %e, "child closed stdin before payload was fully written");
            }
            Err(e) => return Err(e.into()),
        }
    }

    drop(stdin);
    Ok(())
}
