//! Resumable chunk transfer.
//!
//! [`Engine`] sends chunks through a version-control collaborator one at a
//! time, strictly in order, and records each one in the progress ledger once
//! its push has succeeded. Rejected pushes are rolled back and retried
//! forever on a [`Backoff`] schedule. [`Engine::rewrap`] picks up chunks an
//! interrupted run left untracked in the working tree.

mod backoff;
mod engine;
pub mod error;
mod rewrap;

pub use crate::backoff::{Backoff, Schedule};
pub use crate::engine::{DEFAULT_BRANCH, DEFAULT_REMOTE, Engine, TransferEvent};
