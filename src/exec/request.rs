// src/exec/request.rs

//! Per-invocation configuration.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::types::{CommandSpec, OutputMode};

/// Everything needed to run one command.
///
/// Built with [`ExecRequest::shell`] or [`ExecRequest::exec`] and refined
/// with the builder methods. Defaults: text output, no input, caller's cwd,
/// no extra env, capture on, no output limit, no timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    pub command: CommandSpec,
    pub mode: OutputMode,
    pub input: Option<Vec<u8>>,
    pub cwd: Option<PathBuf>,
    /// Extra variables merged over the inherited environment.
    pub env: BTreeMap<String, String>,
    pub capture_output: bool,
    /// Per-stream byte cap. Exceeding it kills the child.
    pub output_limit: Option<usize>,
    pub timeout: Option<Duration>,
}

impl ExecRequest {
    pub fn new(command: CommandSpec) -> Self {
        Self {
            command,
            mode: OutputMode::Text,
            input: None,
            cwd: None,
            env: BTreeMap::new(),
            capture_output: true,
            output_limit: None,
            timeout: None,
        }
    }

    /// A command string run through the host shell.
    pub fn shell(cmd: impl Into<String>) -> Self {
        Self::new(CommandSpec::Shell(cmd.into()))
    }

    /// A program and its arguments, run without a shell.
    ///
    /// An empty iterator produces an empty program name, which fails at spawn
    /// time like any other missing executable.
    pub fn exec<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = argv.into_iter().map(Into::into);
        let program = argv.next().unwrap_or_default();
        Self::new(CommandSpec::Exec {
            program,
            args: argv.collect(),
        })
    }

    pub fn mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    /// Shorthand for `.mode(OutputMode::Binary)`.
    pub fn binary(self) -> Self {
        self.mode(OutputMode::Binary)
    }

    /// Payload written to the child's stdin before it is closed.
    ///
    /// Accepts text (`&str`, `String`) or bytes (`&[u8]`, `Vec<u8>`).
    pub fn input(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn capture_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }

    pub fn output_limit(mut self, bytes: usize) -> Self {
        self.output_limit = Some(bytes);
        self
    }

    /// Wall-clock limit for the run. `Duration::ZERO` means no limit.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
