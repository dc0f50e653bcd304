//! Reassembling a file from its parts.

use crate::error::{ErrorKind, Result};
use crate::name::find_parts;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::instrument;

/// Outcome of [`recombine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recombined {
    pub target: PathBuf,
    /// Number of parts concatenated.
    pub parts: usize,
    /// Bytes written to the target.
    pub bytes: u64,
}

/// Concatenate every part of `target` in index order into `target` itself,
/// replacing whatever was there.
///
/// Returns [`NoParts`](ErrorKind::NoParts) without touching `target` when no
/// part exists. The reconstructed length is reported but never checked
/// against the original file: no record of the original length is kept.
#[instrument(skip_all, fields(target = %target.as_ref().display()))]
pub async fn recombine(target: impl AsRef<Path>) -> Result<Recombined> {
    let target = target.as_ref();
    let parts = find_parts(target).await?;
    if parts.is_empty() {
        exn::bail!(ErrorKind::NoParts(target.to_path_buf()));
    }

    let file = File::create(target).await.map_err(|e| ErrorKind::io(e, target))?;
    let mut writer = BufWriter::new(file);
    let mut bytes = 0;
    for chunk in &parts {
        let mut part = File::open(&chunk.path).await.map_err(|e| ErrorKind::io(e, &chunk.path))?;
        bytes += tokio::io::copy(&mut part, &mut writer).await.map_err(ErrorKind::Io)?;
    }
    writer.flush().await.map_err(ErrorKind::Io)?;
    tracing::debug!(parts = parts.len(), bytes, "Parts recombined");
    Ok(Recombined { target: target.to_path_buf(), parts: parts.len(), bytes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DEFAULT_CHUNK_SIZE, ensure_split};

    #[tokio::test]
    async fn test_round_trip_25_mib() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("disk.img");
        let data: Vec<u8> = (0..25 * 1024 * 1024).map(|i: u32| (i.wrapping_mul(31) >> 3) as u8).collect();
        std::fs::write(&source, &data).unwrap();

        let split = ensure_split(&source, DEFAULT_CHUNK_SIZE).await.unwrap();
        let sizes: Vec<_> = split.chunks.iter().map(|c| std::fs::metadata(&c.path).unwrap().len()).collect();
        assert_eq!(sizes, vec![DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_SIZE, 5 * 1024 * 1024]);

        std::fs::remove_file(&source).unwrap();
        let recombined = recombine(&source).await.unwrap();
        assert_eq!(recombined.parts, 3);
        assert_eq!(recombined.bytes, data.len() as u64);
        assert_eq!(std::fs::read(&source).unwrap(), data);
    }

    #[tokio::test]
    async fn test_overwrites_existing_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("notes.txt");
        std::fs::write(crate::part_path(&target, 1), b" world").unwrap();
        std::fs::write(crate::part_path(&target, 0), b"hello").unwrap();
        std::fs::write(&target, b"something much longer than the parts").unwrap();
        recombine(&target).await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn test_no_parts_leaves_target_alone() {
        let dir = tempfile::tempdir().unwrap();
        let absent = dir.path().join("absent.bin");
        let err = recombine(&absent).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NoParts(p) if p == &absent));
        assert!(!absent.exists());

        let present = dir.path().join("present.bin");
        std::fs::write(&present, b"original").unwrap();
        assert!(recombine(&present).await.is_err());
        assert_eq!(std::fs::read(&present).unwrap(), b"original");
    }
}
