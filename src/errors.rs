// src/errors.rs

//! Crate-wide error type and `Result` alias.
//!
//! A command that runs and exits non-zero is *not* an error: it is reported
//! as an [`ExecResult`](crate::types::ExecResult) with `success == false`.
//! Errors are reserved for "the command could not be run" ([`Spawn`]) and
//! "the command had to be killed" ([`Timeout`]).
//!
//! [`Spawn`]: ProcgateError::Spawn
//! [`Timeout`]: ProcgateError::Timeout

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcgateError {
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProcgateError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProcgateError::Timeout { .. })
    }

    pub fn is_spawn(&self) -> bool {
        matches!(self, ProcgateError::Spawn { .. })
    }
}

pub type Result<T> = std::result::Result<T, ProcgateError>;
