//! Chunk naming convention.
//!
//! Every part of a source file lives next to it as `<source>.part.<NNN>`,
//! where `NNN` is the zero-based part index padded to three digits. The file
//! name is the only place a part's index is recorded.

use crate::INDEX_WIDTH;
use crate::error::{ErrorKind, Result};
use regex::Regex;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use tokio::fs;

const PART_INFIX: &str = ".part.";

/// Matches file names that follow the chunk naming convention. The first
/// capture group is the part index.
pub static CHUNK_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.part\.(\d{3})$").unwrap());

/// A single part of a source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Chunk {
    /// The file this chunk was split from.
    pub source: PathBuf,
    /// Zero-based position of the chunk within its source.
    pub index: u32,
    /// Where the chunk lives on disk.
    pub path: PathBuf,
}
impl Chunk {
    pub fn new(source: impl Into<PathBuf>, index: u32) -> Self {
        let source = source.into();
        let path = part_path(&source, index);
        Self { source, index, path }
    }

    /// Recognise a chunk from its path alone (used for chunks discovered by
    /// listing a working tree rather than by splitting).
    ///
    /// ```
    /// use partpush_chunk::Chunk;
    /// use std::path::Path;
    ///
    /// let chunk = Chunk::from_path("media/video.mkv.part.012").unwrap();
    /// assert_eq!(chunk.index, 12);
    /// assert_eq!(chunk.source, Path::new("media/video.mkv"));
    /// assert!(Chunk::from_path("media/video.mkv").is_none());
    /// ```
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let name = path.file_name()?.as_encoded_bytes();
        let (stem, index) = split_part_name(name)?;
        if stem.is_empty() {
            return None;
        }
        // Dropping `.NNN` and then `.part` leaves the source, without ever
        // decoding the name.
        let source = path.with_extension("").with_extension("");
        Some(Self { source, index, path })
    }

    /// Identifier written to the ledger and used in commit messages.
    pub fn id(&self) -> String {
        identifier(&self.path)
    }
}

/// Normalised, path-like identifier for a chunk: `.` components are dropped
/// so that `./a.bin.part.000` and `a.bin.part.000` are the same chunk.
pub fn identifier(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect::<PathBuf>()
        .to_string_lossy()
        .into_owned()
}

/// Path of the part with the given index.
///
/// ```
/// use partpush_chunk::part_path;
/// use std::path::Path;
///
/// assert_eq!(part_path(Path::new("backup.tar"), 7), Path::new("backup.tar.part.007"));
/// ```
pub fn part_path(source: impl AsRef<Path>, index: u32) -> PathBuf {
    let mut name = source.as_ref().as_os_str().to_owned();
    name.push(format!("{PART_INFIX}{index:0width$}", width = INDEX_WIDTH));
    PathBuf::from(name)
}

/// Split a file name into the source name and the part index, working on
/// raw bytes so names that are not valid UTF-8 still match.
fn split_part_name(name: &[u8]) -> Option<(&[u8], u32)> {
    let digits_at = name.len().checked_sub(INDEX_WIDTH)?;
    let (rest, digits) = name.split_at(digits_at);
    if !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let stem = rest.strip_suffix(PART_INFIX.as_bytes())?;
    let index = digits.iter().fold(0, |acc, d| acc * 10 + u32::from(d - b'0'));
    Some((stem, index))
}

/// Index encoded in `candidate` if it names a part of a source called `stem`.
pub(crate) fn parse_index(stem: &OsStr, candidate: &OsStr) -> Option<u32> {
    let (found, index) = split_part_name(candidate.as_encoded_bytes())?;
    (found == stem.as_encoded_bytes()).then_some(index)
}

/// List the parts of `source` currently on disk, ordered by index.
///
/// A missing parent directory means there are no parts, not an error.
pub async fn find_parts(source: impl AsRef<Path>) -> Result<Vec<Chunk>> {
    let source = source.as_ref();
    let Some(stem) = source.file_name() else {
        return Ok(Vec::new());
    };
    let dir = match source.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut entries = match fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => exn::bail!(ErrorKind::io(err, dir)),
    };
    let mut parts = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| ErrorKind::io(e, &dir))? {
        let name = entry.file_name();
        let Some(index) = parse_index(stem, &name) else {
            continue;
        };
        let file_type = entry.file_type().await.map_err(|e| ErrorKind::io(e, entry.path()))?;
        if !file_type.is_file() {
            continue;
        }
        parts.push(Chunk { source: source.to_path_buf(), index, path: source.with_file_name(name) });
    }
    parts.sort_by_key(|chunk| chunk.index);
    Ok(parts)
}
