use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Split large files into chunks and push them to a git remote, one
/// resumable commit at a time.
#[derive(Parser, Debug)]
#[command(name = "partpush", version, about)]
pub struct Cli {
    /// Split the files and stop; no version-control operations at all.
    #[arg(long)]
    pub split_only: bool,

    /// After pushing each file, also push any untracked chunk left behind by
    /// an earlier, interrupted run.
    #[arg(long)]
    pub rewrap: bool,

    /// Reassemble each FILE from its parts instead (overrides every other
    /// mode).
    #[arg(long)]
    pub recombine: bool,

    /// More output (-v for debug, -vv for trace).
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only report errors.
    #[arg(short, long)]
    pub quiet: bool,

    /// Read configuration from this file instead of `partpush.toml`.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Files to split and push (or to recombine).
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Split, then stage, commit and push every chunk.
    Push,
    SplitOnly,
    /// [`Push`](Self::Push), followed by a sweep for stray chunks.
    Rewrap,
    Recombine,
}
impl Cli {
    /// Recombine beats split-only, which beats rewrap.
    pub fn mode(&self) -> Mode {
        if self.recombine {
            Mode::Recombine
        } else if self.split_only {
            Mode::SplitOnly
        } else if self.rewrap {
            Mode::Rewrap
        } else {
            Mode::Push
        }
    }
}
