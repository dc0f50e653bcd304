//! Binary Error Types
//!
//! Everything here is fatal: recoverable conditions (rejected pushes,
//! nothing to commit, recombine targets without parts) are handled before
//! they could become errors.

use derive_more::{Display, Error};

/// A top-level error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for the binary.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not set up logging")]
    Logging,
    #[display("could not load configuration")]
    Config,
    #[display("could not split or recombine {}", _0.display())]
    Chunk(#[error(not(source))] std::path::PathBuf),
    #[display("could not prepare the repository")]
    Repository,
    #[display("transfer failed")]
    Transfer,
}
