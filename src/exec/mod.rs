// src/exec/mod.rs

//! Process execution layer.
//!
//! One invocation flows through these pieces in order:
//!
//! - [`gate`] admits it once fewer than the configured number of children
//!   are running.
//! - [`launcher`] spawns the child with `tokio::process::Command` and feeds
//!   its stdin.
//! - [`reader`] drains stdout/stderr concurrently, enforcing the output
//!   limit.
//! - [`deadline`] races all of that against the timeout and tears the child
//!   down when it expires.
//!
//! [`executor`] composes them behind [`Executor::execute`] and the
//! [`Execute`] trait, which tests can replace with a fake implementation.

pub mod deadline;
pub mod executor;
pub mod gate;
pub mod launcher;
pub mod reader;
pub mod request;

pub use deadline::{DEFAULT_GRACE_PERIOD, Termination};
pub use executor::{
    ExecConfig, Execute, Executor, SUBPROCESS_RESOURCE, default_max_subprocesses,
};
pub use gate::{ConcurrencyGate, ConcurrencySlot};
pub use reader::CHUNK_SIZE;
pub use request::ExecRequest;
