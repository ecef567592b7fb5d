// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::exec::{DEFAULT_GRACE_PERIOD, ExecConfig, default_max_subprocesses};

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [subprocess]
/// max_subprocesses = 4
/// grace_period = "2s"
/// timeout = "30s"
/// output_limit = 1048576
/// ```
///
/// Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub subprocess: SubprocessSection,
}

/// `[subprocess]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubprocessSection {
    /// Maximum number of children running at once. Defaults to the CPU count.
    #[serde(default)]
    pub max_subprocesses: Option<usize>,

    /// Wait between SIGTERM and SIGKILL for a timed-out child.
    #[serde(default)]
    pub grace_period: Option<String>,

    /// Default timeout for invocations that don't set their own.
    #[serde(default)]
    pub timeout: Option<String>,

    /// Default per-stream output cap in bytes.
    #[serde(default)]
    pub output_limit: Option<usize>,
}

/// Validated configuration.
///
/// Construct via `TryFrom<RawConfigFile>` (see `validate.rs`) or
/// [`load_and_validate`](crate::config::load_and_validate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub max_subprocesses: Option<usize>,
    pub grace_period: Duration,
    pub timeout: Option<Duration>,
    pub output_limit: Option<usize>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        max_subprocesses: Option<usize>,
        grace_period: Duration,
        timeout: Option<Duration>,
        output_limit: Option<usize>,
    ) -> Self {
        Self {
            max_subprocesses,
            grace_period,
            timeout,
            output_limit,
        }
    }

    /// Executor settings described by this file.
    pub fn exec_config(&self) -> ExecConfig {
        ExecConfig {
            max_subprocesses: self
                .max_subprocesses
                .unwrap_or_else(default_max_subprocesses),
            grace_period: self.grace_period,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(None, DEFAULT_GRACE_PERIOD, None, None)
    }
}
