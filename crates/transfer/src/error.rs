//! Transfer Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! A rejected push never shows up here: it is retried by the engine and only
//! reported as a [`PushFailed`](crate::TransferEvent::PushFailed) event.

use derive_more::{Display, Error};

/// A transfer error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for transfer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a transfer failure.
///
/// ### Dependency Errors
/// - [`ErrorKind::Ledger`]
/// - [`ErrorKind::Collaborator`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Reading or appending to the progress ledger failed.
    #[display("progress ledger failed")]
    Ledger,
    /// The version-control collaborator could not carry out an operation.
    #[display("version-control operation failed")]
    Collaborator,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            _ => false,
        }
    }
}
