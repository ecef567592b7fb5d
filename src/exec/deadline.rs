// src/exec/deadline.rs

//! Wall-clock deadline for a running child, and the teardown that follows
//! when it expires.
//!
//! ```text
//! Running ──(work finished)──────────────────────────────▶ Completed
//!    │
//!    └──(deadline)──▶ Expired ──SIGTERM──▶ Terminating ──(exit | SIGKILL)──▶ Terminated
//! ```
//!
//! Termination is best-effort: every failure along the way is logged and
//! swallowed, and the caller always gets a timeout error afterwards.

use std::future::Future;
use std::time::Duration;

use tokio::process::Child;
use tracing::{debug, warn};

/// Wait between the graceful termination request and the forced kill.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// How a timed-out child ended up being stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Exited within the grace period after the termination request.
    Graceful,
    /// Still running after the grace period and was killed.
    Forced,
}

#[derive(Debug, Clone, Copy)]
pub struct DeadlineController {
    timeout: Option<Duration>,
    grace_period: Duration,
}

impl DeadlineController {
    /// A zero `timeout` is treated as no timeout.
    pub fn new(timeout: Option<Duration>, grace_period: Duration) -> Self {
        Self {
            timeout: timeout.filter(|d| !d.is_zero()),
            grace_period,
        }
    }

    /// Run `work` to completion, or until the deadline passes.
    ///
    /// Returns `None` if the deadline won; `work` has been dropped by then,
    /// so anything it borrowed is free again for [`terminate`](Self::terminate).
    /// Without a timeout this simply awaits `work`.
    pub async fn race<F: Future>(&self, work: F) -> Option<F::Output> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, work).await.ok(),
            None => Some(work.await),
        }
    }

    /// Ask `child` to exit, give it the grace period, then kill it.
    pub async fn terminate(&self, child: &mut Child, command: &str) -> Termination {
        if let Err(e) = request_exit(child) {
            warn!(command = %command, error = %e, "unexpected error terminating timed out process");
        }

        match tokio::time::timeout(self.grace_period, child.wait()).await {
            Ok(Ok(status)) => {
                debug!(
                    command = %command,
                    ?status,
                    "timed out process exited after termination request"
                );
                return Termination::Graceful;
            }
            Ok(Err(e)) => {
                warn!(command = %command, error = %e, "error waiting for timed out process");
            }
            Err(_) => {
                debug!(
                    command = %command,
                    grace_ms = self.grace_period.as_millis() as u64,
                    "timed out process still running after grace period; killing"
                );
            }
        }

        if let Err(e) = child.kill().await {
            warn!(command = %command, error = %e, "unexpected error killing timed out process");
        }
        Termination::Forced
    }
}

/// Send the graceful termination request.
///
/// Unix gets SIGTERM. Elsewhere there is no graceful equivalent for a bare
/// child process, so the kill is started right away.
#[cfg(unix)]
fn request_exit(child: &mut Child) -> std::io::Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    match child.id() {
        Some(pid) => {
            kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(std::io::Error::from)
        }
        // Already reaped.
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn request_exit(child: &mut Child) -> std::io::Result<()> {
    child.start_kill()
}

#[cfg(all(test, unix))]
mod tests {
    use std::process::Stdio;
    use std::time::Instant;

    use tokio::process::Command;

    use super::*;

    fn spawn_sh(script: &str) -> Child {
        Command::new("sh")
            .arg("-c")
            .arg(script)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .expect("spawn sh")
    }

    #[tokio::test]
    async fn race_without_timeout_is_a_pass_through() {
        let controller = DeadlineController::new(None, DEFAULT_GRACE_PERIOD);
        assert_eq!(controller.race(async { 42 }).await, Some(42));
    }

    #[tokio::test]
    async fn race_returns_none_when_deadline_wins() {
        let controller =
            DeadlineController::new(Some(Duration::from_millis(20)), DEFAULT_GRACE_PERIOD);
        let out = controller
            .race(tokio::time::sleep(Duration::from_secs(5)))
            .await;
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn zero_timeout_never_expires() {
        let controller = DeadlineController::new(Some(Duration::ZERO), DEFAULT_GRACE_PERIOD);
        let out = controller
            .race(tokio::time::sleep(Duration::from_millis(50)))
            .await;
        assert!(out.is_some());
    }

    #[tokio::test]
    async fn cooperative_child_exits_gracefully() {
        let mut child = spawn_sh("exec sleep 30");
        let controller = DeadlineController::new(None, Duration::from_secs(5));

        let started = Instant::now();
        let how = controller.terminate(&mut child, "sleep 30").await;

        assert_eq!(how, Termination::Graceful);
        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(child.try_wait().unwrap().is_some());
    }

    #[tokio::test]
    async fn child_ignoring_sigterm_is_killed_after_grace() {
        let mut child = spawn_sh("trap '' TERM; exec sleep 30");
        // Let the shell install the trap before signalling it.
        tokio::time::sleep(Duration::from_millis(200)).await;
        let controller = DeadlineController::new(None, Duration::from_millis(300));

        let how = controller.terminate(&mut child, "stubborn").await;

        assert_eq!(how, Termination::Forced);
        assert!(child.try_wait().unwrap().is_some());
    }

    #[tokio::test]
    async fn terminating_an_exited_child_does_not_panic() {
        let mut child = spawn_sh("exit 0");
        child.wait().await.unwrap();
        let controller = DeadlineController::new(None, Duration::from_millis(50));

        let how = controller.terminate(&mut child, "exit 0").await;
        assert_eq!(how, Termination::Graceful);
    }
}
