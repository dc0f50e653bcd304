//! Collaborator Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! A rejected push is *not* an error: it is reported as
//! [`PushOutcome::Rejected`](crate::PushOutcome::Rejected) so the caller can
//! retry it. Everything here means the collaborator itself could not do what
//! it was asked.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A collaborator error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for collaborator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// No git executable on `PATH` and none configured.
    #[display("git executable not found")]
    GitNotFound,
    /// The command could not be started at all.
    #[display("could not run `{_0}`: {_1}")]
    Spawn(String, #[error(source)] IoError),
    /// The command ran but exited unsuccessfully.
    #[display("`{command}` failed ({status}): {stderr}")]
    CommandFailed { command: String, status: String, stderr: String },
    /// Reading or writing a file next to the repository (the ignore file).
    #[display("I/O error on {}: {_1}", _0.display())]
    Io(PathBuf, #[error(source)] IoError),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(..))
    }
}
