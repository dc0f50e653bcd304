//! Git command-line collaborator.

use crate::collaborator::{Collaborator, CommitOutcome, PushOutcome};
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use regex::Regex;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;

/// Drives the `git` executable inside a working tree.
///
/// Every command runs as `git -C <root> ...` so the process working
/// directory does not matter.
///
/// ```no_run
/// use partpush_vcs::{Collaborator, GitCollaborator, PushOutcome};
/// use std::path::Path;
///
/// # async fn example() -> partpush_vcs::error::Result<()> {
/// let git = GitCollaborator::discover(".", None)?;
/// git.stage(Path::new("video.mkv.part.000")).await?;
/// git.commit(Path::new("video.mkv.part.000"), "Add video.mkv.part.000").await?;
/// if let PushOutcome::Rejected(reason) = git.push("origin", "main").await? {
///     eprintln!("push failed: {reason}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GitCollaborator {
    name: String,
    git: PathBuf,
    root: PathBuf,
}
impl GitCollaborator {
    pub fn new(git: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self { name: "git".to_string(), git: git.into(), root: root.into() }
    }

    /// Use `explicit` as the git executable, or find `git` on `PATH`.
    pub fn discover(root: impl Into<PathBuf>, explicit: Option<&Path>) -> Result<Self> {
        let git = match explicit {
            Some(path) => path.to_path_buf(),
            None => which::which("git").or_raise(|| ErrorKind::GitNotFound)?,
        };
        tracing::debug!(git = %git.display(), "Using git executable");
        Ok(Self::new(git, root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn describe(args: &[&OsStr]) -> String {
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy()).collect();
        format!("git {}", args.join(" "))
    }

    /// Run a git command to completion, capturing its output whatever the
    /// exit status.
    async fn output(&self, args: &[&OsStr]) -> Result<Output> {
        tracing::trace!(command = %Self::describe(args), "Running git");
        let output = Command::new(&self.git)
            .arg("-C")
            .arg(&self.root)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ErrorKind::Spawn(Self::describe(args), e))?;
        Ok(output)
    }

    /// Run a git command that must succeed, returning its stdout.
    async fn run(&self, args: &[&OsStr]) -> Result<String> {
        let output = self.output(args).await?;
        if !output.status.success() {
            exn::bail!(ErrorKind::CommandFailed {
                command: Self::describe(args),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Whether `HEAD` (or `HEAD~1`) names a commit.
    async fn resolves(&self, revision: &str) -> Result<bool> {
        let args = [OsStr::new("rev-parse"), OsStr::new("--verify"), OsStr::new("-q"), OsStr::new(revision)];
        Ok(self.output(&args).await?.status.success())
    }
}

#[async_trait]
impl Collaborator for GitCollaborator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stage(&self, path: &Path) -> Result<()> {
        self.run(&[OsStr::new("add"), OsStr::new("-f"), OsStr::new("--"), path.as_os_str()]).await?;
        Ok(())
    }

    async fn commit(&self, path: &Path, message: &str) -> Result<CommitOutcome> {
        // `diff --quiet` exits 0 for "no differences" and 1 for "differences".
        let args = ["diff", "--cached", "--quiet", "--"].map(OsStr::new);
        let mut args = args.to_vec();
        args.push(path.as_os_str());
        let output = self.output(&args).await?;
        match output.status.code() {
            Some(0) => return Ok(CommitOutcome::NothingToCommit),
            Some(1) => {},
            _ => exn::bail!(ErrorKind::CommandFailed {
                command: Self::describe(&args),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
        let args = ["commit", "-q", "-m", message, "--"].map(OsStr::new);
        let mut args = args.to_vec();
        args.push(path.as_os_str());
        self.run(&args).await?;
        Ok(CommitOutcome::Committed)
    }

    async fn push(&self, remote: &str, branch: &str) -> Result<PushOutcome> {
        let output = self.output(&[OsStr::new("push"), OsStr::new(remote), OsStr::new(branch)]).await?;
        if output.status.success() {
            return Ok(PushOutcome::Pushed);
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Ok(PushOutcome::Rejected(stderr))
    }

    async fn undo_last_commit(&self) -> Result<()> {
        if self.resolves("HEAD~1").await? {
            self.run(&[OsStr::new("reset"), OsStr::new("--soft"), OsStr::new("HEAD~1")]).await?;
        } else {
            // Root commit: there is no parent to reset to, so drop the ref
            // and leave everything staged on an unborn branch.
            self.run(&[OsStr::new("update-ref"), OsStr::new("-d"), OsStr::new("HEAD")]).await?;
        }
        Ok(())
    }

    async fn unstage(&self, path: &Path) -> Result<()> {
        if self.resolves("HEAD").await? {
            self.run(&[OsStr::new("reset"), OsStr::new("-q"), OsStr::new("--"), path.as_os_str()]).await?;
        } else {
            let args = ["rm", "--cached", "-q", "--ignore-unmatch", "--"].map(OsStr::new);
            let mut args = args.to_vec();
            args.push(path.as_os_str());
            self.run(&args).await?;
        }
        Ok(())
    }

    async fn list_untracked(&self, pattern: &Regex) -> Result<Vec<PathBuf>> {
        let args = ["ls-files", "--others", "--exclude-standard", "-z"].map(OsStr::new);
        let stdout = self.run(&args).await?;
        Ok(stdout.split('\0').filter(|p| !p.is_empty() && pattern.is_match(p)).map(PathBuf::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;

    const CHUNKS: &str = r"\.part\.\d{3}$";

    /// A working tree with a bare `origin` next to it. `None` when git is
    /// not installed, in which case the test has nothing to check.
    fn repository() -> Option<(tempfile::TempDir, GitCollaborator)> {
        let git = which::which("git").ok()?;
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        let remote = dir.path().join("remote.git");
        let sh = |cwd: &Path, args: &[&str]| {
            let status = StdCommand::new(&git).current_dir(cwd).args(args).output().unwrap();
            assert!(status.status.success(), "git {args:?}: {}", String::from_utf8_lossy(&status.stderr));
        };
        std::fs::create_dir(&work).unwrap();
        sh(dir.path(), &["init", "-q", "--bare", "remote.git"]);
        sh(&work, &["init", "-q"]);
        sh(&work, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        sh(&work, &["config", "user.name", "Test"]);
        sh(&work, &["config", "user.email", "test@example.com"]);
        sh(&work, &["config", "commit.gpgsign", "false"]);
        sh(&work, &["remote", "add", "origin", remote.to_str().unwrap()]);
        Some((dir, GitCollaborator::new(git, work)))
    }

    fn write(git: &GitCollaborator, name: &str, data: &[u8]) -> PathBuf {
        std::fs::write(git.root().join(name), data).unwrap();
        PathBuf::from(name)
    }

    #[tokio::test]
    async fn test_stage_commit_push() {
        let Some((_dir, git)) = repository() else { return };
        let part = write(&git, "a.bin.part.000", b"one");
        git.stage(&part).await.unwrap();
        assert_eq!(git.commit(&part, "Add a.bin.part.000").await.unwrap(), CommitOutcome::Committed);
        assert_eq!(git.push("origin", "main").await.unwrap(), PushOutcome::Pushed);
    }

    #[tokio::test]
    async fn test_nothing_to_commit() {
        let Some((_dir, git)) = repository() else { return };
        let part = write(&git, "a.bin.part.000", b"one");
        git.stage(&part).await.unwrap();
        git.commit(&part, "first").await.unwrap();
        // Same content staged again: nothing changes.
        git.stage(&part).await.unwrap();
        assert_eq!(git.commit(&part, "second").await.unwrap(), CommitOutcome::NothingToCommit);
    }

    #[tokio::test]
    async fn test_commit_only_takes_the_given_path() {
        let Some((_dir, git)) = repository() else { return };
        let part = write(&git, "a.bin.part.000", b"one");
        git.stage(&part).await.unwrap();
        git.commit(&part, "first").await.unwrap();
        let unrelated = write(&git, "notes.txt", b"text");
        git.stage(&unrelated).await.unwrap();

        // Something else is staged, but not the chunk.
        git.stage(&part).await.unwrap();
        assert_eq!(git.commit(&part, "again").await.unwrap(), CommitOutcome::NothingToCommit);

        let second = write(&git, "a.bin.part.001", b"two");
        git.stage(&second).await.unwrap();
        assert_eq!(git.commit(&second, "second").await.unwrap(), CommitOutcome::Committed);
        let args = ["show", "--name-only", "--format=", "HEAD"].map(OsStr::new);
        assert_eq!(git.run(&args).await.unwrap().trim(), "a.bin.part.001");
        let args = ["diff", "--cached", "--name-only"].map(OsStr::new);
        assert_eq!(git.run(&args).await.unwrap().trim(), "notes.txt");
    }

    #[tokio::test]
    async fn test_stage_ignored_file_is_forced() {
        let Some((_dir, git)) = repository() else { return };
        write(&git, ".gitignore", b"*.part.*\n");
        let part = write(&git, "a.bin.part.000", b"one");
        git.stage(&part).await.unwrap();
        assert_eq!(git.commit(&part, "forced").await.unwrap(), CommitOutcome::Committed);
    }

    #[tokio::test]
    async fn test_push_to_unknown_remote_is_rejected() {
        let Some((_dir, git)) = repository() else { return };
        let part = write(&git, "a.bin.part.000", b"one");
        git.stage(&part).await.unwrap();
        git.commit(&part, "Add").await.unwrap();
        assert!(matches!(git.push("nowhere", "main").await.unwrap(), PushOutcome::Rejected(_)));
    }

    #[tokio::test]
    async fn test_undo_and_unstage_restore_untracked() {
        let Some((_dir, git)) = repository() else { return };
        let pattern = Regex::new(CHUNKS).unwrap();
        let first = write(&git, "a.bin.part.000", b"one");
        git.stage(&first).await.unwrap();
        git.commit(&first, "first").await.unwrap();
        let second = write(&git, "a.bin.part.001", b"two");
        git.stage(&second).await.unwrap();
        git.commit(&second, "second").await.unwrap();

        git.undo_last_commit().await.unwrap();
        git.unstage(&second).await.unwrap();
        assert_eq!(git.list_untracked(&pattern).await.unwrap(), vec![second.clone()]);

        // Root commit has no parent.
        git.undo_last_commit().await.unwrap();
        git.unstage(&first).await.unwrap();
        let mut untracked = git.list_untracked(&pattern).await.unwrap();
        untracked.sort();
        assert_eq!(untracked, vec![first, second]);
    }

    #[tokio::test]
    async fn test_list_untracked_filters_by_pattern() {
        let Some((_dir, git)) = repository() else { return };
        write(&git, "a.bin", b"whole");
        write(&git, "a.bin.part.000", b"part");
        write(&git, "notes.txt", b"text");
        let untracked = git.list_untracked(&Regex::new(CHUNKS).unwrap()).await.unwrap();
        assert_eq!(untracked, vec![PathBuf::from("a.bin.part.000")]);
    }

    #[tokio::test]
    async fn test_outside_repository_is_an_error() {
        let Ok(binary) = which::which("git") else { return };
        let dir = tempfile::tempdir().unwrap();
        let git = GitCollaborator::new(binary, dir.path());
        std::fs::write(dir.path().join("x.part.000"), b"x").unwrap();
        let err = git.stage(Path::new("x.part.000")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let dir = tempfile::tempdir().unwrap();
        let git = GitCollaborator::new(dir.path().join("no-such-git"), dir.path());
        let err = git.push("origin", "main").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Spawn(..)));
    }
}
