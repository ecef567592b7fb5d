// src/config/validate.rs

use std::time::Duration;

use crate::config::duration::parse_duration;
use crate::config::model::{ConfigFile, RawConfigFile, SubprocessSection};
use crate::errors::{ProcgateError, Result};
use crate::exec::DEFAULT_GRACE_PERIOD;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ProcgateError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let section = raw.subprocess;
        validate_max_subprocesses(&section)?;

        let grace_period = match &section.grace_period {
            Some(s) => parse_field("grace_period", s)?,
            None => DEFAULT_GRACE_PERIOD,
        };

        // Zero disables the timeout, matching `--timeout 0`.
        let timeout = match &section.timeout {
            Some(s) => Some(parse_field("timeout", s)?).filter(|d| !d.is_zero()),
            None => None,
        };

        Ok(ConfigFile::new_unchecked(
            section.max_subprocesses,
            grace_period,
            timeout,
            section.output_limit,
        ))
    }
}

fn validate_max_subprocesses(section: &SubprocessSection) -> Result<()> {
    if section.max_subprocesses == Some(0) {
        return Err(ProcgateError::ConfigError(
            "subprocess.max_subprocesses must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn parse_field(field: &str, value: &str) -> Result<Duration> {
    parse_duration(value)
        .map_err(|e| ProcgateError::ConfigError(format!("subprocess.{field}: {e}")))
}
