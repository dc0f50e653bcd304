use crate::cli::Mode;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use futures::{Stream, StreamExt};
use partpush_chunk::{ensure_split, recombine};
use partpush_config::Config;
use partpush_ledger::FileLedger;
use partpush_transfer::{Backoff, Engine, TransferEvent};
use partpush_vcs::{GitCollaborator, IgnoreRules};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

/// Running totals for one invocation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub split: usize,
    pub resplit: usize,
    pub transferred: usize,
    pub skipped: usize,
    pub unchanged: usize,
    pub retries: usize,
    pub recombined: usize,
    pub missing: usize,
}
impl Summary {
    fn observe(&mut self, event: &TransferEvent) {
        match event {
            TransferEvent::Started(count) => tracing::debug!(chunks = count, "Transfer started"),
            TransferEvent::Skipped(_) => self.skipped += 1,
            TransferEvent::NothingToCommit(_) => self.unchanged += 1,
            TransferEvent::PushFailed { .. } => self.retries += 1,
            TransferEvent::Transferred { .. } => self.transferred += 1,
            TransferEvent::Complete => {},
        }
    }

    pub fn log(&self, mode: Mode) {
        match mode {
            Mode::Recombine => {
                tracing::info!(recombined = self.recombined, missing = self.missing, "Done");
            },
            Mode::SplitOnly => {
                tracing::info!(files = self.split, resplit = self.resplit, "Done");
            },
            Mode::Push | Mode::Rewrap => tracing::info!(
                files = self.split,
                transferred = self.transferred,
                skipped = self.skipped,
                unchanged = self.unchanged,
                retries = self.retries,
                "Done"
            ),
        }
    }
}

/// Carry out `mode` for `files`. `root` is the working tree: git runs there,
/// and a relative ledger or ignore file is resolved against it.
pub async fn run(mode: Mode, root: &Path, files: &[PathBuf], config: &Config) -> Result<Summary> {
    let mut summary = Summary::default();
    match mode {
        Mode::Recombine => recombine_all(files, &mut summary).await?,
        Mode::SplitOnly => {
            for file in files {
                split(file, config, &mut summary).await?;
            }
        },
        Mode::Push | Mode::Rewrap => push_all(root, files, config, mode == Mode::Rewrap, &mut summary).await?,
    }
    Ok(summary)
}

async fn recombine_all(files: &[PathBuf], summary: &mut Summary) -> Result<()> {
    for file in files {
        let result = recombine(file).await;
        if let Err(e) = &result
            && let partpush_chunk::error::ErrorKind::NoParts(_) = &**e
        {
            tracing::error!(file = %file.display(), "No parts to recombine; skipping");
            summary.missing += 1;
            continue;
        }
        let recombined = result.or_raise(|| ErrorKind::Chunk(file.clone()))?;
        tracing::info!(file = %file.display(), parts = recombined.parts, bytes = recombined.bytes, "Recombined");
        summary.recombined += 1;
    }
    Ok(())
}

async fn split(file: &Path, config: &Config, summary: &mut Summary) -> Result<Vec<partpush_chunk::Chunk>> {
    let split = ensure_split(file, config.chunk_size).await.or_raise(|| ErrorKind::Chunk(file.to_path_buf()))?;
    summary.split += 1;
    if split.resplit {
        summary.resplit += 1;
    }
    tracing::debug!(file = %file.display(), parts = split.chunks.len(), resplit = split.resplit, "Split ready");
    Ok(split.chunks)
}

#[instrument(skip(files, config, summary))]
async fn push_all(root: &Path, files: &[PathBuf], config: &Config, rewrap: bool, summary: &mut Summary) -> Result<()> {
    let git = GitCollaborator::discover(root, config.git.as_deref()).or_raise(|| ErrorKind::Repository)?;
    let ignore_file = root.join(&config.ignore_file);
    let rules = config
        .ignore_patterns
        .iter()
        .fold(IgnoreRules::for_sources(&config.ledger, files.iter().map(PathBuf::as_path)), |rules, pattern| {
            rules.with_pattern(pattern.as_str())
        });
    let added = rules.ensure(&ignore_file).await.or_raise(|| ErrorKind::Repository)?;
    if !added.is_empty() {
        tracing::info!(file = %ignore_file.display(), ?added, "Ignore rules added");
    }

    let backoff = Backoff::new(config.backoff.initial(), config.backoff.step(), config.backoff.max());
    let engine = Engine::new(Arc::new(git), Arc::new(FileLedger::new(root.join(&config.ledger))))
        .with_backoff(backoff)
        .with_target(&config.remote, &config.branch);

    for file in files {
        let chunks = split(file, config, summary).await?;
        tracing::info!(file = %file.display(), chunks = chunks.len(), "Transferring");
        drain(engine.transfer(chunks), summary).await?;
        if rewrap {
            drain(engine.rewrap(), summary).await?;
        }
    }
    Ok(())
}

async fn drain(
    events: impl Stream<Item = partpush_transfer::error::Result<TransferEvent>>,
    summary: &mut Summary,
) -> Result<()> {
    let mut events = std::pin::pin!(events);
    while let Some(event) = events.next().await {
        summary.observe(&event.or_raise(|| ErrorKind::Transfer)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use partpush_config::BackoffConfig;

    #[test]
    fn test_summary_counts_events() {
        let mut summary = Summary::default();
        let events = [
            TransferEvent::Started(3),
            TransferEvent::Skipped("a.part.000".to_string()),
            TransferEvent::PushFailed {
                chunk: "a.part.001".to_string(),
                attempt: 1,
                retry_in: std::time::Duration::from_secs(10),
                reason: "offline".to_string(),
            },
            TransferEvent::Transferred { chunk: "a.part.001".to_string(), attempts: 2 },
            TransferEvent::NothingToCommit("a.part.002".to_string()),
            TransferEvent::Complete,
        ];
        for event in &events {
            summary.observe(event);
        }
        assert_eq!(summary, Summary { transferred: 1, skipped: 1, unchanged: 1, retries: 1, ..Summary::default() });
    }

    #[tokio::test]
    async fn test_split_only_never_needs_a_repository() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.bin");
        std::fs::write(&file, vec![1u8; 25]).unwrap();
        let config = Config { chunk_size: 10, git: Some(dir.path().join("no-such-git")), ..Config::default() };
        let summary = run(Mode::SplitOnly, dir.path(), &[file.clone()], &config).await.unwrap();
        assert_eq!(summary.split, 1);
        assert!(partpush_chunk::part_path(&file, 2).exists());
        assert!(!dir.path().join(".gitignore").exists());
    }

    #[tokio::test]
    async fn test_recombine_missing_parts_continues() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("present.bin");
        std::fs::write(partpush_chunk::part_path(&present, 0), b"abc").unwrap();
        let absent = dir.path().join("absent.bin");
        let files = [absent.clone(), present.clone()];
        let summary = run(Mode::Recombine, dir.path(), &files, &Config::default()).await.unwrap();
        assert_eq!(summary.missing, 1);
        assert_eq!(summary.recombined, 1);
        assert_eq!(std::fs::read(&present).unwrap(), b"abc");
        assert!(!absent.exists());
    }

    #[tokio::test]
    async fn test_unreadable_source_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config { chunk_size: 10, ..Config::default() };
        let err = run(Mode::SplitOnly, dir.path(), &[dir.path().join("missing.bin")], &config).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Chunk(_)));
    }

    fn git(cwd: &Path, args: &[&str]) -> String {
        let output = std::process::Command::new("git").current_dir(cwd).args(args).output().unwrap();
        assert!(output.status.success(), "git {args:?}: {}", String::from_utf8_lossy(&output.stderr));
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// A `work` tree whose only remote, `backup`, is the bare `remote.git`
    /// next to it. `None` when git is not installed.
    fn repository() -> Option<tempfile::TempDir> {
        which::which("git").ok()?;
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        std::fs::create_dir(&work).unwrap();
        git(dir.path(), &["init", "-q", "--bare", "remote.git"]);
        git(&work, &["init", "-q"]);
        git(&work, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git(&work, &["config", "user.name", "Test"]);
        git(&work, &["config", "user.email", "test@example.com"]);
        git(&work, &["config", "commit.gpgsign", "false"]);
        git(&work, &["remote", "add", "backup", dir.path().join("remote.git").to_str().unwrap()]);
        Some(dir)
    }

    #[tokio::test]
    async fn test_rewrap_pushes_parts_and_strays() {
        let Some(dir) = repository() else { return };
        let work = dir.path().join("work");
        let source = work.join("a.bin");
        std::fs::write(&source, vec![3u8; 25]).unwrap();
        std::fs::write(work.join("old.iso.part.000"), b"left behind").unwrap();
        let config = Config {
            chunk_size: 10,
            remote: "backup".to_string(),
            ignore_patterns: vec!["*.tmp".to_string()],
            backoff: BackoffConfig { initial_secs: 0, step_secs: 0, max_secs: 0 },
            ..Config::default()
        };

        let summary = run(Mode::Rewrap, &work, &[source], &config).await.unwrap();
        assert_eq!(summary.split, 1);
        assert_eq!(summary.transferred, 4);
        assert_eq!(summary.retries, 0);

        let remote = dir.path().join("remote.git");
        assert_eq!(git(&remote, &["rev-list", "--count", "main"]), "4");
        let files = git(&remote, &["ls-tree", "-r", "--name-only", "main"]);
        assert_eq!(files.lines().collect::<Vec<_>>(), [
            "a.bin.part.000",
            "a.bin.part.001",
            "a.bin.part.002",
            "old.iso.part.000"
        ]);

        let ledger = std::fs::read_to_string(work.join(".partpush-ledger")).unwrap();
        assert_eq!(ledger.lines().count(), 4);
        assert!(ledger.lines().any(|line| line == "old.iso.part.000"));
        let ignore = std::fs::read_to_string(work.join(".gitignore")).unwrap();
        assert_eq!(ignore.lines().collect::<Vec<_>>(), [".partpush-ledger", "*.bin", "*.tmp"]);

        // Everything is in the ledger now, so a second run sends nothing.
        let summary = run(Mode::Rewrap, &work, &[work.join("a.bin")], &config).await.unwrap();
        assert_eq!(summary.transferred, 0);
        assert_eq!(summary.skipped, 3);
        assert_eq!(git(&remote, &["rev-list", "--count", "main"]), "4");
    }
}
