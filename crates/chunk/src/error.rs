//! Chunk Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A chunking error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for chunking operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Source file (or one of its parts) does not exist.
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Recombine was asked for a file that has no parts on disk.
    #[display("no parts found for {}", _0.display())]
    NoParts(#[error(not(source))] PathBuf),
    /// The source needs more parts than the three-digit suffix can name.
    #[display("{_0} parts needed but only {} can be named", crate::MAX_PARTS)]
    TooManyParts(#[error(not(source))] u64),
    /// A fresh split left a different number of parts than expected.
    #[display("split produced {found} parts, expected {expected}")]
    Incomplete { expected: u64, found: u64 },
    /// Chunk size of zero bytes.
    #[display("chunk size must be greater than zero")]
    InvalidChunkSize,
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}
impl ErrorKind {
    pub(crate) fn io(err: IoError, path: impl Into<PathBuf>) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.into()),
            _ => Self::Io(err),
        }
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::NoParts(PathBuf::from("big.iso")).to_string(), "no parts found for big.iso");
        assert_eq!(ErrorKind::TooManyParts(1001).to_string(), "1001 parts needed but only 1000 can be named");
        assert_eq!(
            ErrorKind::Incomplete { expected: 3, found: 2 }.to_string(),
            "split produced 2 parts, expected 3"
        );
    }

    #[test]
    fn not_found_is_mapped_from_io() {
        let err = IoError::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(ErrorKind::io(err, Path::new("a.bin")), ErrorKind::NotFound(p) if p == Path::new("a.bin")));
    }

    #[test]
    fn error_kind_retryable() {
        assert!(!ErrorKind::NoParts(PathBuf::from("x")).is_retryable());
        assert!(!ErrorKind::InvalidChunkSize.is_retryable());
        assert!(ErrorKind::Io(IoError::other("disk")).is_retryable());
    }
}
