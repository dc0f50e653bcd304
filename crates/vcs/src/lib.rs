//! Version-control collaborator.
//!
//! Chunks reach the remote through a small set of version-control
//! operations: stage, commit, push, undo the last commit, unstage, and list
//! untracked files. [`Collaborator`] captures exactly those, so the transfer
//! engine can be driven by real git ([`GitCollaborator`]) or by a scripted
//! stand-in (`MockCollaborator`, behind the `mock` feature).
//!
//! [`IgnoreRules`] keeps the ignore file in step so that whole source files
//! and the ledger are never picked up as ordinary content.

pub mod collaborator;
pub mod error;
mod ignore;

pub use crate::collaborator::{Collaborator, CommitOutcome, GitCollaborator, PushOutcome};
#[cfg(feature = "mock")]
pub use crate::collaborator::{MockCollaborator, Operation};
pub use crate::ignore::IgnoreRules;
use std::sync::Arc;

pub type CollaboratorHandle = Arc<dyn Collaborator + Send + Sync>;
