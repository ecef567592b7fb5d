// src/types.rs

use std::fmt;

/// How a command is handed to the OS.
///
/// - `Shell`: a single string interpreted by the host shell (`sh -c` or
///   `cmd /C`), so pipes, globs and redirections work.
/// - `Exec`: a program plus arguments executed directly. Shell metacharacters
///   in the arguments are passed through literally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSpec {
    Shell(String),
    Exec { program: String, args: Vec<String> },
}

impl CommandSpec {
    /// Human-readable rendering used in logs and error messages.
    ///
    /// Argument vectors are joined with shell quoting so the message can be
    /// pasted back into a terminal.
    pub fn display_string(&self) -> String {
        match self {
            CommandSpec::Shell(cmd) => cmd.clone(),
            CommandSpec::Exec { program, args } => {
                shell_words::join(std::iter::once(program).chain(args.iter()))
            }
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_string())
    }
}

/// Whether captured output is decoded as text or returned as raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Text,
    Binary,
}

/// Captured stdout/stderr of one invocation.
///
/// Both streams always share a representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapturedOutput {
    Text { stdout: String, stderr: String },
    Binary { stdout: Vec<u8>, stderr: Vec<u8> },
}

impl CapturedOutput {
    /// Build from raw stream bytes according to `mode`.
    ///
    /// Text mode decodes lossily: a stream cut off by the output limit may end
    /// in the middle of a UTF-8 sequence.
    pub fn from_bytes(mode: OutputMode, stdout: Vec<u8>, stderr: Vec<u8>) -> Self {
        match mode {
            OutputMode::Text => CapturedOutput::Text {
                stdout: String::from_utf8_lossy(&stdout).into_owned(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
            },
            OutputMode::Binary => CapturedOutput::Binary { stdout, stderr },
        }
    }

    pub fn empty(mode: OutputMode) -> Self {
        Self::from_bytes(mode, Vec::new(), Vec::new())
    }

    pub fn mode(&self) -> OutputMode {
        match self {
            CapturedOutput::Text { .. } => OutputMode::Text,
            CapturedOutput::Binary { .. } => OutputMode::Binary,
        }
    }
}

/// Outcome of a command that ran to completion (or was killed for exceeding
/// its output limit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// `true` iff `returncode == 0`.
    pub success: bool,
    /// Exit status. A child killed by signal `S` reports `-S` on Unix.
    pub returncode: i32,
    pub output: CapturedOutput,
}

impl ExecResult {
    pub fn new(returncode: i32, output: CapturedOutput) -> Self {
        Self {
            success: returncode == 0,
            returncode,
            output,
        }
    }

    /// Stdout as text, if this result was captured in text mode.
    pub fn stdout_text(&self) -> Option<&str> {
        match &self.output {
            CapturedOutput::Text { stdout, .. } => Some(stdout),
            CapturedOutput::Binary { .. } => None,
        }
    }

    /// Stderr as text, if this result was captured in text mode.
    pub fn stderr_text(&self) -> Option<&str> {
        match &self.output {
            CapturedOutput::Text { stderr, .. } => Some(stderr),
            CapturedOutput::Binary { .. } => None,
        }
    }

    /// Raw stdout bytes, regardless of mode.
    pub fn stdout_bytes(&self) -> &[u8] {
        match &self.output {
            CapturedOutput::Text { stdout, .. } => stdout.as_bytes(),
            CapturedOutput::Binary { stdout, .. } => stdout,
        }
    }

    /// Raw stderr bytes, regardless of mode.
    pub fn stderr_bytes(&self) -> &[u8] {
        match &self.output {
            CapturedOutput::Text { stderr, .. } => stderr.as_bytes(),
            CapturedOutput::Binary { stderr, .. } => stderr,
        }
    }
}
