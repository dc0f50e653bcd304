//! Ignore-file bookkeeping.

use crate::error::{ErrorKind, Result};
use std::ffi::OsStr;
use std::path::Path;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Patterns that must appear in the ignore file.
///
/// Only chunks are ever staged on purpose (and they are staged with force),
/// so the ignore file is there to keep whole source files and the ledger out
/// of any ordinary `add`.
///
/// ```
/// use partpush_vcs::IgnoreRules;
/// use std::path::Path;
///
/// let rules = IgnoreRules::for_sources(Path::new(".partpush-ledger"), [Path::new("media/video.mkv")]);
/// assert_eq!(rules.patterns(), [".partpush-ledger", "*.mkv"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreRules {
    patterns: Vec<String>,
}
impl IgnoreRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pattern, unless it is blank or already present.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into().trim().to_string();
        if !pattern.is_empty() && !self.patterns.contains(&pattern) {
            self.patterns.push(pattern);
        }
        self
    }

    /// The ledger's file name, plus `*.<ext>` for every source. Sources
    /// without an extension get their bare file name instead, and so do
    /// sources whose extension is three digits: `*.001` would also match
    /// every chunk's `.part.001` suffix.
    pub fn for_sources<'a>(ledger: &Path, sources: impl IntoIterator<Item = &'a Path>) -> Self {
        let mut rules = Self::new();
        if let Some(name) = ledger.file_name() {
            rules = rules.with_pattern(name.to_string_lossy());
        }
        for source in sources {
            let pattern = match (source.extension(), source.file_name()) {
                (Some(ext), _) if !is_part_index(ext) => format!("*.{}", ext.to_string_lossy()),
                (_, Some(name)) => name.to_string_lossy().into_owned(),
                (_, None) => continue,
            };
            rules = rules.with_pattern(pattern);
        }
        rules
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Append every pattern missing from `file` (creating it if needed) and
    /// return the ones that were added. Existing lines are left untouched.
    pub async fn ensure(&self, file: impl AsRef<Path>) -> Result<Vec<String>> {
        let file = file.as_ref();
        let existing = match fs::read_to_string(file).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => exn::bail!(ErrorKind::Io(file.to_path_buf(), e)),
        };
        let present: Vec<&str> = existing.lines().map(str::trim).collect();
        let missing: Vec<String> =
            self.patterns.iter().filter(|p| !present.contains(&p.as_str())).cloned().collect();
        if missing.is_empty() {
            return Ok(missing);
        }

        let mut text = String::new();
        if !existing.is_empty() && !existing.ends_with('\n') {
            text.push('\n');
        }
        for pattern in &missing {
            text.push_str(pattern);
            text.push('\n');
        }
        let mut handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file)
            .await
            .map_err(|e| ErrorKind::Io(file.to_path_buf(), e))?;
        handle.write_all(text.as_bytes()).await.map_err(|e| ErrorKind::Io(file.to_path_buf(), e))?;
        handle.flush().await.map_err(|e| ErrorKind::Io(file.to_path_buf(), e))?;
        tracing::debug!(file = %file.display(), added = ?missing, "Ignore file updated");
        Ok(missing)
    }
}

fn is_part_index(ext: &OsStr) -> bool {
    let ext = ext.as_encoded_bytes();
    ext.len() == 3 && ext.iter().all(u8::is_ascii_digit)
}
