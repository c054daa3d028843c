// src/errors.rs

//! Crate-wide error types.
//!
//! Executor construction and spawn failures get structured variants so
//! callers can tell them apart; everything else flows through `anyhow`.

use thiserror::Error;

pub use anyhow::{Error, Result};

/// Errors surfaced synchronously by command executors.
///
/// Anything that happens *after* a worker process is up (transport errors,
/// redirect problems) is local to that worker and only visible to the caller
/// as "process exited without a result".
#[derive(Debug, Error)]
pub enum CommandError {
    /// The worker or CLI process could not be created.
    #[error("failed to spawn process for '{id}'")]
    SpawnFailure {
        id: String,
        #[source]
        source: std::io::Error,
    },

    /// A CLI command was executed without a configured binary.
    #[error("unable to execute CLI without binary: {0}")]
    MissingBinary(String),

    /// The request spec could not be serialized for the worker launch.
    #[error("failed to serialize request spec")]
    InvalidSpec(#[from] serde_json::Error),
}
