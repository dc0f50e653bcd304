//! Progress ledger.
//!
//! The ledger is the only thing that makes a transfer resumable: an
//! append-only list of chunk identifiers that have been pushed. A chunk whose
//! identifier is in the ledger is never sent again, whatever the remote
//! currently holds. Entries are never removed or compacted, and recording the
//! same identifier twice is harmless.

pub mod error;
mod file;
#[cfg(feature = "mock")]
mod memory;

pub use crate::file::FileLedger;
#[cfg(feature = "mock")]
pub use crate::memory::MemoryLedger;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::sync::Arc;

pub type LedgerHandle = Arc<dyn Ledger + Send + Sync>;

/// Durable record of transferred chunks.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Exact membership test; no normalisation is applied to `id`.
    async fn has(&self, id: &str) -> Result<bool>;

    /// Append `id`. Never deduplicates.
    async fn record(&self, id: &str) -> Result<()>;
}

/// Identifiers are stored one per line.
pub(crate) fn validate_identifier(id: &str) -> Result<()> {
    if id.is_empty() || id.contains(['\n', '\r']) {
        exn::bail!(ErrorKind::InvalidIdentifier(id.to_string()));
    }
    Ok(())
}
