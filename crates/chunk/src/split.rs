//! Splitting a source file into fixed-size parts.

use crate::error::{ErrorKind, Result};
use crate::name::{Chunk, find_parts};
use crate::MAX_PARTS;
use exn::ResultExt;
use std::path::Path;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::instrument;

/// Outcome of [`ensure_split`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    /// Every part of the source, ordered by index.
    pub chunks: Vec<Chunk>,
    /// `true` if the existing parts were discarded and the source split again.
    pub resplit: bool,
}

/// Number of parts a file of `len` bytes splits into.
///
/// ```
/// use partpush_chunk::expected_parts;
///
/// assert_eq!(expected_parts(0, 10), 0);
/// assert_eq!(expected_parts(25, 10), 3);
/// ```
pub fn expected_parts(len: u64, chunk_size: u64) -> u64 {
    len.div_ceil(chunk_size)
}

/// Size the part at `index` must have: `chunk_size`, except for the last part
/// which holds the remainder.
fn part_size(len: u64, chunk_size: u64, index: u32) -> u64 {
    let start = u64::from(index).saturating_mul(chunk_size);
    len.saturating_sub(start).min(chunk_size)
}

/// Make sure the parts of `source` on disk are exactly the parts a fresh split
/// would produce, re-splitting when they are not.
///
/// Parts are accepted as-is when their count matches [`expected_parts`], the
/// indices run from zero without gaps, and each part has the size the split
/// would give it. Anything else (missing, extra, or left over from an earlier
/// version of the source) causes every existing part to be removed before the
/// source is split again.
#[instrument(skip_all, fields(source = %source.as_ref().display()))]
pub async fn ensure_split(source: impl AsRef<Path>, chunk_size: u64) -> Result<Split> {
    let source = source.as_ref();
    if chunk_size == 0 {
        exn::bail!(ErrorKind::InvalidChunkSize);
    }
    let len = fs::metadata(source).await.map_err(|e| ErrorKind::io(e, source))?.len();
    let expected = expected_parts(len, chunk_size);
    if expected > u64::from(MAX_PARTS) {
        exn::bail!(ErrorKind::TooManyParts(expected));
    }

    let existing = find_parts(source).await?;
    if layout_matches(&existing, len, chunk_size).await? {
        tracing::debug!(parts = existing.len(), "Existing parts match the source; nothing to split");
        return Ok(Split { chunks: existing, resplit: false });
    }

    tracing::info!(expected, found = existing.len(), "Parts on disk do not match the source; re-splitting");
    for chunk in &existing {
        fs::remove_file(&chunk.path).await.map_err(|e| ErrorKind::io(e, &chunk.path))?;
    }
    let parts = u32::try_from(expected).or_raise(|| ErrorKind::TooManyParts(expected))?;
    write_parts(source, parts, chunk_size).await?;

    let chunks = find_parts(source).await?;
    if !layout_matches(&chunks, len, chunk_size).await? {
        let found = u64::try_from(chunks.len()).unwrap_or(u64::MAX);
        exn::bail!(ErrorKind::Incomplete { expected, found });
    }
    Ok(Split { chunks, resplit: true })
}

async fn layout_matches(parts: &[Chunk], len: u64, chunk_size: u64) -> Result<bool> {
    if u64::try_from(parts.len()).ok() != Some(expected_parts(len, chunk_size)) {
        return Ok(false);
    }
    for (position, chunk) in parts.iter().enumerate() {
        if usize::try_from(chunk.index).ok() != Some(position) {
            return Ok(false);
        }
        let size = fs::metadata(&chunk.path).await.map_err(|e| ErrorKind::io(e, &chunk.path))?.len();
        if size != part_size(len, chunk_size, chunk.index) {
            tracing::debug!(part = %chunk.path.display(), size, "Part has unexpected size");
            return Ok(false);
        }
    }
    Ok(true)
}

async fn write_parts(source: &Path, parts: u32, chunk_size: u64) -> Result<()> {
    let file = File::open(source).await.map_err(|e| ErrorKind::io(e, source))?;
    let mut reader = BufReader::new(file);
    for index in 0..parts {
        let chunk = Chunk::new(source, index);
        let file = File::create(&chunk.path).await.map_err(|e| ErrorKind::io(e, &chunk.path))?;
        let mut writer = BufWriter::new(file);
        let mut limited = (&mut reader).take(chunk_size);
        let bytes = tokio::io::copy(&mut limited, &mut writer).await.map_err(ErrorKind::Io)?;
        writer.flush().await.map_err(ErrorKind::Io)?;
        tracing::trace!(part = %chunk.path.display(), bytes, "Part written");
    }
    Ok(())
}
