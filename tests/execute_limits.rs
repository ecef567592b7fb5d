#![cfg(unix)]

use std::error::Error;
use std::path::Path;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use tempfile::tempdir;

use procgate::errors::ProcgateError;
use procgate::exec::CHUNK_SIZE;
use procgate::{ExecConfig, ExecRequest, Executor};
use procgate_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn executor_with_grace(grace_period: Duration) -> Executor {
    init_tracing();
    Executor::new(ExecConfig {
        max_subprocesses: 4,
        grace_period,
    })
}

fn read_pid(path: &Path) -> Result<Pid, Box<dyn Error>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(Pid::from_raw(raw.trim().parse()?))
}

fn assert_gone(pid: Pid) {
    assert_eq!(kill(pid, None), Err(Errno::ESRCH), "process {pid} is still around");
}

#[tokio::test]
async fn output_limit_kills_endless_writer() -> TestResult {
    let dir = tempdir()?;
    let pid_file = dir.path().join("pid");
    let exec = executor_with_grace(Duration::from_secs(2));

    let result = with_timeout(exec.execute(
        ExecRequest::shell(format!("echo $$ > '{}'; exec yes", pid_file.display()))
            .output_limit(1024),
    ))
    .await?;

    // Killed by a signal: SIGKILL from the limit, or SIGPIPE if it wrote
    // again after the read end closed.
    assert!(!result.success);
    assert!(result.returncode < 0, "returncode {}", result.returncode);
    let captured = result.stdout_bytes().len();
    assert!(captured > 1024, "captured {captured} bytes");
    assert!(captured <= 1024 + CHUNK_SIZE, "captured {captured} bytes");
    assert_gone(read_pid(&pid_file)?);
    Ok(())
}

#[tokio::test]
async fn one_mebibyte_with_small_limit_is_bounded() -> TestResult {
    let exec = executor_with_grace(Duration::from_secs(2));

    let result = with_timeout(exec.execute(
        ExecRequest::exec(["head", "-c", "1048576", "/dev/zero"])
            .binary()
            .output_limit(1024),
    ))
    .await?;

    assert!(result.stdout_bytes().len() <= 1024 + CHUNK_SIZE);
    assert!(!result.success);
    Ok(())
}

#[tokio::test]
async fn output_limit_applies_to_stderr() -> TestResult {
    let exec = executor_with_grace(Duration::from_secs(2));

    let result = with_timeout(exec.execute(ExecRequest::shell("exec yes >&2").output_limit(4096)))
        .await?;

    assert!(!result.success);
    assert!(result.stderr_bytes().len() <= 4096 + CHUNK_SIZE);
    assert!(result.stdout_bytes().is_empty());
    Ok(())
}

#[tokio::test]
async fn output_under_limit_is_untouched() -> TestResult {
    let exec = executor_with_grace(Duration::from_secs(2));

    let result =
        with_timeout(exec.execute(ExecRequest::exec(["echo", "small"]).output_limit(1024))).await?;

    assert!(result.success);
    assert_eq!(result.stdout_text(), Some("small\n"));
    Ok(())
}

#[tokio::test]
async fn timeout_fails_and_leaves_no_child() -> TestResult {
    let dir = tempdir()?;
    let pid_file = dir.path().join("pid");
    let exec = executor_with_grace(Duration::from_secs(2));

    let started = Instant::now();
    let err = with_timeout(exec.execute(
        ExecRequest::shell(format!("echo $$ > '{}'; exec sleep 10", pid_file.display()))
            .timeout(Duration::from_secs(1)),
    ))
    .await
    .expect_err("sleep 10 must time out");
    let elapsed = started.elapsed();

    match &err {
        ProcgateError::Timeout { command, timeout } => {
            assert!(command.contains("sleep 10"));
            assert_eq!(*timeout, Duration::from_secs(1));
        }
        other => panic!("expected Timeout, got {other:?}"),
    }
    assert!(err.is_timeout());
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(4), "took {elapsed:?}");
    assert_gone(read_pid(&pid_file)?);
    assert_eq!(exec.active_subprocesses(), 0);
    Ok(())
}

#[tokio::test]
async fn child_ignoring_sigterm_is_force_killed() -> TestResult {
    let dir = tempdir()?;
    let pid_file = dir.path().join("pid");
    let exec = executor_with_grace(Duration::from_millis(300));

    let started = Instant::now();
    let err = with_timeout(exec.execute(
        ExecRequest::shell(format!(
            "trap '' TERM; echo $$ > '{}'; exec sleep 10",
            pid_file.display()
        ))
        .timeout(Duration::from_millis(500)),
    ))
    .await
    .expect_err("must time out");

    assert!(err.is_timeout());
    // Deadline plus the grace period, with slack for a loaded machine.
    assert!(started.elapsed() >= Duration::from_millis(800));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_gone(read_pid(&pid_file)?);
    Ok(())
}

#[tokio::test]
async fn fast_command_beats_its_timeout() -> TestResult {
    let exec = executor_with_grace(Duration::from_secs(2));

    let result = with_timeout(
        exec.execute(ExecRequest::exec(["echo", "quick"]).timeout(Duration::from_secs(5))),
    )
    .await?;

    assert!(result.success);
    assert_eq!(result.stdout_text(), Some("quick\n"));
    Ok(())
}

#[tokio::test]
async fn timeout_error_carries_no_output() -> TestResult {
    let exec = executor_with_grace(Duration::from_millis(200));

    let err = with_timeout(exec.execute(
        ExecRequest::shell("echo started; exec sleep 10").timeout(Duration::from_millis(300)),
    ))
    .await
    .expect_err("must time out");

    // The child printed before the deadline; none of it leaks into the error.
    assert!(matches!(err, ProcgateError::Timeout { .. }));
    assert!(!err.to_string().contains("started"));
    Ok(())
}

#[tokio::test]
async fn zero_timeout_means_no_timeout() -> TestResult {
    let exec = executor_with_grace(Duration::from_millis(200));

    let request = ExecRequest::exec(["sh", "-c", "sleep 0.2; echo hi"]).timeout(Duration::ZERO);
    let result = with_timeout(exec.execute(request)).await?;

    assert!(result.success);
    assert_eq!(result.stdout_text(), Some("hi\n"));
    Ok(())
}
