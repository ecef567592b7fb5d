// src/exec/executor.rs

//! The entry point: admission, spawn, drain, deadline, result.

use std::future::Future;
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::process::ExitStatus;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tokio::process::Child;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::errors::{ProcgateError, Result};
use crate::exec::deadline::{DEFAULT_GRACE_PERIOD, DeadlineController};
use crate::exec::gate::ConcurrencyGate;
use crate::exec::launcher::{self, ProcessHandle};
use crate::exec::reader::{self, LimitSignal};
use crate::exec::request::ExecRequest;
use crate::types::{CapturedOutput, ExecResult};

/// Gate resource shared by every subprocess invocation.
pub const SUBPROCESS_RESOURCE: &str = "subprocesses";

/// Host CPU count, or 1 if it cannot be determined.
pub fn default_max_subprocesses() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Settings fixed when an [`Executor`] is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecConfig {
    /// Upper bound on simultaneously running children.
    pub max_subprocesses: usize,
    /// Wait between SIGTERM and SIGKILL for a timed-out child.
    pub grace_period: Duration,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            max_subprocesses: default_max_subprocesses(),
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}

/// Trait abstracting how commands are run.
///
/// Production code uses [`Executor`]; tests can provide an implementation
/// that returns canned results without spawning anything.
pub trait Execute: Send + Sync {
    fn execute(
        &self,
        request: ExecRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ExecResult>> + Send + '_>>;
}

/// Runs commands under a shared concurrency bound.
///
/// Clone the gate into several executors (via [`Executor::with_gate`]) when
/// they must share one bound.
#[derive(Debug)]
pub struct Executor {
    gate: Arc<ConcurrencyGate>,
    max_subprocesses: AtomicUsize,
    grace_period: Duration,
}

impl Executor {
    pub fn new(config: ExecConfig) -> Self {
        Self::with_gate(config, Arc::new(ConcurrencyGate::new()))
    }

    pub fn with_gate(config: ExecConfig, gate: Arc<ConcurrencyGate>) -> Self {
        Self {
            gate,
            max_subprocesses: AtomicUsize::new(config.max_subprocesses.max(1)),
            grace_period: config.grace_period,
        }
    }

    /// Override the concurrency bound for invocations started from now on.
    ///
    /// `None` (or zero) restores [`default_max_subprocesses`].
    pub fn init_max_subprocesses(&self, max_subprocesses: Option<usize>) {
        let max = max_subprocesses
            .filter(|&n| n > 0)
            .unwrap_or_else(default_max_subprocesses);
        self.max_subprocesses.store(max, Ordering::SeqCst);
        debug!(max_subprocesses = max, "configured subprocess limit");
    }

    pub fn max_subprocesses(&self) -> usize {
        self.max_subprocesses.load(Ordering::SeqCst)
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    pub fn gate(&self) -> &Arc<ConcurrencyGate> {
        &self.gate
    }

    /// Children currently running under this executor's gate.
    pub fn active_subprocesses(&self) -> usize {
        self.gate.active(SUBPROCESS_RESOURCE)
    }

    /// Run `request` to completion.
    ///
    /// - `Ok(result)` whenever the command ran, including non-zero exits and
    ///   children killed for exceeding the output limit.
    /// - `Err(Spawn)` if it could not be started.
    /// - `Err(Timeout)` if the deadline passed; the child has been stopped.
    ///
    /// The concurrency slot is held from before the spawn until the child has
    /// been reaped or killed. Dropping the returned future kills the child.
    pub async fn execute(&self, request: ExecRequest) -> Result<ExecResult> {
        let command = request.command.display_string();
        let span = info_span!("subprocess", command = %command);

        async move {
            let limit = self.max_subprocesses();
            let _slot = self.gate.acquire(SUBPROCESS_RESOURCE, limit).await;

            let started = Instant::now();
            info!(
                timeout = ?request.timeout,
                output_limit = ?request.output_limit,
                "starting subprocess"
            );

            let mut handle = match launcher::spawn(&request) {
                Ok(handle) => handle,
                Err(e) => {
                    warn!(error = %e, "subprocess could not be started");
                    return Err(e);
                }
            };

            let controller = DeadlineController::new(request.timeout, self.grace_period);
            let outcome = controller.race(run_to_exit(&mut handle, &request)).await;

            match outcome {
                Some(Ok(result)) => {
                    info!(
                        exit_code = result.returncode,
                        success = result.success,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "subprocess exited"
                    );
                    Ok(result)
                }
                Some(Err(e)) => {
                    warn!(error = %e, "subprocess failed");
                    Err(e)
                }
                None => {
                    let timeout = request.timeout.unwrap_or_default();
                    warn!(timeout = ?timeout, "subprocess timed out; terminating");
                    let how = controller.terminate(&mut handle.child, &command).await;
                    debug!(termination = ?how, "timed out subprocess stopped");
                    Err(ProcgateError::Timeout { command, timeout })
                }
            }
        }
        .instrument(span)
        .await
    }
}

impl Execute for Executor {
    fn execute(
        &self,
        request: ExecRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ExecResult>> + Send + '_>> {
        Box::pin(Executor::execute(self, request))
    }
}

/// Feed stdin, drain both output streams, and wait for exit.
async fn run_to_exit(handle: &mut ProcessHandle, request: &ExecRequest) -> Result<ExecResult> {
    let signal = LimitSignal::new();

    let feed = launcher::feed_stdin(handle.stdin.take(), request.input.as_deref());
    let stdout = reader::read_stream(handle.stdout.take(), request.output_limit, &signal);
    let stderr = reader::read_stream(handle.stderr.take(), request.output_limit, &signal);

    let drain = async { tokio::join!(feed, stdout, stderr) };
    tokio::pin!(drain);

    let mut killed = false;
    let (fed, stdout, stderr) = tokio::select! {
        res = &mut drain => res,
        _ = signal.tripped() => {
            kill_over_limit(&mut handle.child);
            killed = true;
            drain.await
        }
    };
    // The readers may all finish in the same poll that trips the signal.
    if signal.is_tripped() && !killed {
        kill_over_limit(&mut handle.child);
    }

    fed?;
    let (stdout, stderr) = (stdout?, stderr?);
    let status = handle.child.wait().await?;

    let output = if request.capture_output {
        CapturedOutput::from_bytes(request.mode, stdout, stderr)
    } else {
        CapturedOutput::empty(request.mode)
    };

    Ok(ExecResult::new(exit_code(status), output))
}

fn kill_over_limit(child: &mut Child) {
    debug!("output limit exceeded; killing child");
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "child already gone when enforcing output limit");
    }
}

/// Numeric exit status; a child killed by signal `S` maps to `-S` on Unix.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }

    -1
}
