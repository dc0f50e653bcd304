//! Collaborator trait and implementations.

mod git;
#[cfg(feature = "mock")]
mod mock;

pub use self::git::GitCollaborator;
#[cfg(feature = "mock")]
pub use self::mock::{MockCollaborator, Operation};
use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Result of a commit request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// Nothing was staged for the path (for example the chunk is identical
    /// to what is already committed). Not an error.
    NothingToCommit,
}

/// Result of a push request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Pushed,
    /// The remote could not be updated; carries whatever the collaborator
    /// said about it. Expected to be retried.
    Rejected(String),
}

/// The version-control operations a transfer needs.
///
/// Paths are relative to the collaborator's working tree. Implementations
/// report recoverable conditions through [`CommitOutcome`] and
/// [`PushOutcome`]; an `Err` means the operation could not be carried out at
/// all and the caller should stop.
#[async_trait]
pub trait Collaborator: Send + Sync {
    /// Name of the collaborator (used for logging only).
    fn name(&self) -> &str;

    /// Stage a file, even if ignore rules would normally exclude it.
    async fn stage(&self, path: &Path) -> Result<()>;

    /// Commit the staged state of `path`, and nothing else, as a single
    /// commit. Other staged files stay staged.
    async fn commit(&self, path: &Path, message: &str) -> Result<CommitOutcome>;

    /// Push local commits to `branch` on `remote`.
    async fn push(&self, remote: &str, branch: &str) -> Result<PushOutcome>;

    /// Remove the most recent local commit, keeping its changes staged.
    async fn undo_last_commit(&self) -> Result<()>;

    /// Remove a file from the staging area, leaving the working tree alone.
    async fn unstage(&self, path: &Path) -> Result<()>;

    /// Untracked (and not ignored) files whose path matches `pattern`.
    async fn list_untracked(&self, pattern: &Regex) -> Result<Vec<PathBuf>>;
}
