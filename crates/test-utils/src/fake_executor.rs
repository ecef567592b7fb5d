use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use procgate::errors::{ProcgateError, Result};
use procgate::{CapturedOutput, ExecRequest, ExecResult, Execute, OutputMode};

/// Canned outcome handed out by [`FakeExecutor`].
#[derive(Debug, Clone)]
pub enum FakeOutcome {
    Exit {
        returncode: i32,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    },
    Timeout,
    SpawnFailure,
}

impl FakeOutcome {
    pub fn exit(returncode: i32, stdout: &str, stderr: &str) -> Self {
        FakeOutcome::Exit {
            returncode,
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }
}

/// An executor that:
/// - records every request it receives
/// - answers with queued [`FakeOutcome`]s (a clean exit 0 once the queue
///   is empty), without spawning anything.
#[derive(Debug, Default)]
pub struct FakeExecutor {
    outcomes: Mutex<VecDeque<FakeOutcome>>,
    requests: Mutex<Vec<ExecRequest>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcome(self, outcome: FakeOutcome) -> Self {
        self.outcomes.lock().unwrap().push_back(outcome);
        self
    }

    /// Requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<ExecRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn answer(&self, request: &ExecRequest) -> Result<ExecResult> {
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| FakeOutcome::exit(0, "", ""));

        let command = request.command.display_string();
        match outcome {
            FakeOutcome::Exit {
                returncode,
                stdout,
                stderr,
            } => {
                let output = if request.capture_output {
                    CapturedOutput::from_bytes(request.mode, stdout, stderr)
                } else {
                    CapturedOutput::empty(request.mode)
                };
                Ok(ExecResult::new(returncode, output))
            }
            FakeOutcome::Timeout => Err(ProcgateError::Timeout {
                command,
                timeout: request.timeout.unwrap_or(Duration::ZERO),
            }),
            FakeOutcome::SpawnFailure => Err(ProcgateError::Spawn {
                command,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "fake spawn failure"),
            }),
        }
    }
}

impl Execute for FakeExecutor {
    fn execute(
        &self,
        request: ExecRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ExecResult>> + Send + '_>> {
        Box::pin(async move {
            let result = self.answer(&request);
            self.requests.lock().unwrap().push(request);
            result
        })
    }
}

/// Convenience for assertions on text-mode requests.
pub fn text_mode(request: &ExecRequest) -> bool {
    request.mode == OutputMode::Text
}
