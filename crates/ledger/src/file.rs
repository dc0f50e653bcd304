//! Plain-text ledger file, one identifier per line.

use crate::error::{ErrorKind, Result};
use crate::{Ledger, validate_identifier};
use async_trait::async_trait;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

/// Ledger stored as a plain-text file in the working directory.
///
/// A missing file is an empty ledger; it is created on the first
/// [`record`](Ledger::record).
///
/// ```no_run
/// use partpush_ledger::{FileLedger, Ledger};
///
/// # async fn example() -> partpush_ledger::error::Result<()> {
/// let ledger = FileLedger::new(".partpush-ledger");
/// if !ledger.has("video.mkv.part.000").await? {
///     // ... push the chunk ...
///     ledger.record("video.mkv.part.000").await?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FileLedger {
    path: PathBuf,
}
impl FileLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, err: std::io::Error) -> ErrorKind {
        ErrorKind::Io(self.path.clone(), err)
    }

    /// Every recorded identifier, in the order recorded (duplicates included).
    pub async fn entries(&self) -> Result<Vec<String>> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => exn::bail!(self.io_error(err)),
        };
        Ok(contents.lines().filter(|line| !line.is_empty()).map(str::to_string).collect())
    }

    /// Whether the file is non-empty and lacks a final newline (hand-edited,
    /// or truncated by a crash mid-append).
    async fn missing_final_newline(&self) -> Result<bool> {
        let mut file = match fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(err) => exn::bail!(self.io_error(err)),
        };
        let len = file.metadata().await.map_err(|e| self.io_error(e))?.len();
        if len == 0 {
            return Ok(false);
        }
        file.seek(SeekFrom::End(-1)).await.map_err(|e| self.io_error(e))?;
        let last = file.read_u8().await.map_err(|e| self.io_error(e))?;
        Ok(last != b'\n')
    }
}

#[async_trait]
impl Ledger for FileLedger {
    async fn has(&self, id: &str) -> Result<bool> {
        Ok(self.entries().await?.iter().any(|entry| entry == id))
    }

    async fn record(&self, id: &str) -> Result<()> {
        validate_identifier(id)?;
        let line = match self.missing_final_newline().await? {
            true => format!("\n{id}\n"),
            false => format!("{id}\n"),
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        file.write_all(line.as_bytes()).await.map_err(|e| self.io_error(e))?;
        file.sync_data().await.map_err(|e| self.io_error(e))?;
        tracing::debug!(ledger = %self.path.display(), chunk = id, "Recorded in ledger");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileLedger::new(dir.path().join("ledger"));
        assert!(!ledger.has("a.bin.part.000").await.unwrap());
        assert!(ledger.entries().await.unwrap().is_empty());
        assert!(!ledger.path().exists());
    }

    #[tokio::test]
    async fn test_record_then_has() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileLedger::new(dir.path().join("ledger"));
        ledger.record("a.bin.part.000").await.unwrap();
        assert!(ledger.has("a.bin.part.000").await.unwrap());
        assert!(!ledger.has("a.bin.part.001").await.unwrap());
        assert_eq!(std::fs::read_to_string(ledger.path()).unwrap(), "a.bin.part.000\n");
    }

    #[tokio::test]
    async fn test_membership_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileLedger::new(dir.path().join("ledger"));
        ledger.record("dir/a.bin.part.000").await.unwrap();
        assert!(!ledger.has("a.bin.part.000").await.unwrap());
        assert!(!ledger.has("dir/a.bin.part.00").await.unwrap());
        assert!(!ledger.has("dir/a.bin.part.0000").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicates_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileLedger::new(dir.path().join("ledger"));
        ledger.record("a.bin.part.000").await.unwrap();
        ledger.record("a.bin.part.000").await.unwrap();
        assert_eq!(ledger.entries().await.unwrap(), vec!["a.bin.part.000", "a.bin.part.000"]);
        assert!(ledger.has("a.bin.part.000").await.unwrap());
    }

    #[tokio::test]
    async fn test_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger");
        FileLedger::new(&path).record("a.bin.part.000").await.unwrap();
        FileLedger::new(&path).record("a.bin.part.001").await.unwrap();
        let reopened = FileLedger::new(&path);
        assert!(reopened.has("a.bin.part.000").await.unwrap());
        assert!(reopened.has("a.bin.part.001").await.unwrap());
    }

    #[tokio::test]
    async fn test_appends_after_unterminated_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger");
        std::fs::write(&path, "a.bin.part.000").unwrap();
        let ledger = FileLedger::new(&path);
        ledger.record("a.bin.part.001").await.unwrap();
        assert_eq!(ledger.entries().await.unwrap(), vec!["a.bin.part.000", "a.bin.part.001"]);
    }

    #[tokio::test]
    async fn test_rejects_multiline_identifier() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileLedger::new(dir.path().join("ledger"));
        let err = ledger.record("a\nb").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidIdentifier(_)));
        assert!(!ledger.path().exists());
    }
}
