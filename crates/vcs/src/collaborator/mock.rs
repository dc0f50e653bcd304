//! In-memory collaborator for testing.

use crate::collaborator::{Collaborator, CommitOutcome, PushOutcome};
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// A call made against a [`MockCollaborator`], in the order it was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Stage(PathBuf),
    Commit(String),
    Push { remote: String, branch: String },
    UndoLastCommit,
    Unstage(PathBuf),
    ListUntracked,
}

#[derive(Debug, Default)]
struct State {
    untracked: BTreeSet<PathBuf>,
    staged: BTreeSet<PathBuf>,
    tracked: BTreeSet<PathBuf>,
    /// Commits not yet pushed, oldest first.
    local: Vec<Vec<PathBuf>>,
    /// Commits the remote has accepted, oldest first.
    remote: Vec<Vec<PathBuf>>,
    push_failures: usize,
    broken: BTreeSet<PathBuf>,
    operations: Vec<Operation>,
}

/// In-memory collaborator for testing.
///
/// Models just enough of a repository to drive a transfer: files move from
/// untracked to staged to committed, and commits move to the remote when a
/// push succeeds. Every call is recorded as an [`Operation`].
///
/// # Examples
///
/// ```
/// use partpush_vcs::{Collaborator, CommitOutcome, MockCollaborator, PushOutcome};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let vcs = MockCollaborator::with_untracked(["a.bin.part.000"]).with_push_failures(1);
/// let part = Path::new("a.bin.part.000");
/// vcs.stage(part).await?;
/// assert_eq!(vcs.commit(part, "Add a.bin.part.000").await?, CommitOutcome::Committed);
/// assert!(matches!(vcs.push("origin", "main").await?, PushOutcome::Rejected(_)));
/// assert_eq!(vcs.push("origin", "main").await?, PushOutcome::Pushed);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MockCollaborator {
    name: String,
    state: Mutex<State>,
}

impl MockCollaborator {
    /// Create a mock whose working tree holds the given untracked files.
    pub fn with_untracked(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        let state = State { untracked: paths.into_iter().map(Into::into).collect(), ..State::default() };
        Self { name: "mock".to_string(), state: Mutex::new(state) }
    }

    /// Mark files as already committed (and pushed). Staging them again
    /// changes nothing.
    pub fn with_tracked(mut self, paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        let state = self.state.get_mut();
        for path in paths {
            let path = path.into();
            state.untracked.remove(&path);
            state.tracked.insert(path);
        }
        self
    }

    /// Reject the next `failures` pushes.
    pub fn with_push_failures(mut self, failures: usize) -> Self {
        self.state.get_mut().push_failures = failures;
        self
    }

    /// Make staging `path` fail outright, as if the collaborator itself broke.
    pub fn with_broken(mut self, path: impl Into<PathBuf>) -> Self {
        self.state.get_mut().broken.insert(path.into());
        self
    }

    /// Change the name of the mock collaborator.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Every call made so far.
    pub async fn operations(&self) -> Vec<Operation> {
        self.state.lock().await.operations.clone()
    }

    /// Commits accepted by the remote, oldest first.
    pub async fn pushed(&self) -> Vec<Vec<PathBuf>> {
        self.state.lock().await.remote.clone()
    }

    /// Files neither staged nor committed.
    pub async fn untracked(&self) -> Vec<PathBuf> {
        self.state.lock().await.untracked.iter().cloned().collect()
    }

    /// Files currently staged.
    pub async fn staged(&self) -> Vec<PathBuf> {
        self.state.lock().await.staged.iter().cloned().collect()
    }
}
impl Default for MockCollaborator {
    fn default() -> Self {
        Self::with_untracked(Vec::<PathBuf>::new())
    }
}

fn failed(command: &str, stderr: &str) -> ErrorKind {
    ErrorKind::CommandFailed { command: command.to_string(), status: "mock".to_string(), stderr: stderr.to_string() }
}

#[async_trait]
impl Collaborator for MockCollaborator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stage(&self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().await;
        state.operations.push(Operation::Stage(path.to_path_buf()));
        if state.broken.contains(path) {
            exn::bail!(failed("stage", "broken"));
        }
        if state.tracked.contains(path) {
            return Ok(());
        }
        state.untracked.remove(path);
        state.staged.insert(path.to_path_buf());
        Ok(())
    }

    async fn commit(&self, path: &Path, message: &str) -> Result<CommitOutcome> {
        let mut state = self.state.lock().await;
        state.operations.push(Operation::Commit(message.to_string()));
        if !state.staged.remove(path) {
            return Ok(CommitOutcome::NothingToCommit);
        }
        state.tracked.insert(path.to_path_buf());
        state.local.push(vec![path.to_path_buf()]);
        Ok(CommitOutcome::Committed)
    }

    async fn push(&self, remote: &str, branch: &str) -> Result<PushOutcome> {
        let mut state = self.state.lock().await;
        state.operations.push(Operation::Push { remote: remote.to_string(), branch: branch.to_string() });
        if state.push_failures > 0 {
            state.push_failures -= 1;
            return Ok(PushOutcome::Rejected("remote unreachable".to_string()));
        }
        let local = std::mem::take(&mut state.local);
        state.remote.extend(local);
        Ok(PushOutcome::Pushed)
    }

    async fn undo_last_commit(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.operations.push(Operation::UndoLastCommit);
        let Some(files) = state.local.pop() else {
            exn::bail!(failed("undo", "no local commit"));
        };
        for file in files {
            state.tracked.remove(&file);
            state.staged.insert(file);
        }
        Ok(())
    }

    async fn unstage(&self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().await;
        state.operations.push(Operation::Unstage(path.to_path_buf()));
        if state.staged.remove(path) {
            state.untracked.insert(path.to_path_buf());
        }
        Ok(())
    }

    async fn list_untracked(&self, pattern: &Regex) -> Result<Vec<PathBuf>> {
        let mut state = self.state.lock().await;
        state.operations.push(Operation::ListUntracked);
        Ok(state.untracked.iter().filter(|p| pattern.is_match(&p.to_string_lossy())).cloned().collect())
    }
}
