//! Fixed-size chunking of large files.
//!
//! A source file is cut into sequential parts of [`DEFAULT_CHUNK_SIZE`] bytes
//! (the last part holds the remainder) which are written next to it as
//! `<source>.part.000`, `<source>.part.001`, ... The parts on disk are the
//! only record of a split; nothing else describes them.
//!
//! - [`ensure_split`] makes the parts on disk agree with the source,
//!   re-splitting from scratch whenever they don't.
//! - [`recombine`] concatenates the parts back into the source path.
//! - [`Chunk`] and [`find_parts`] deal with the naming convention.

pub mod error;
mod name;
mod recombine;
mod split;

pub use crate::name::{CHUNK_PATTERN, Chunk, find_parts, identifier, part_path};
pub use crate::recombine::{Recombined, recombine};
pub use crate::split::{Split, ensure_split, expected_parts};

/// 10 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 10 * 1024 * 1024;
/// Digits in a part's index suffix.
pub const INDEX_WIDTH: usize = 3;
/// Parts a three-digit suffix can name.
pub const MAX_PARTS: u32 = 1000;
