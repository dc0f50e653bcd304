//! In-memory ledger for testing.

use crate::error::Result;
use crate::{Ledger, validate_identifier};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// In-memory ledger for testing.
///
/// ```
/// use partpush_ledger::{Ledger, MemoryLedger};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let ledger = MemoryLedger::with_entries(["a.bin.part.000"]);
/// assert!(ledger.has("a.bin.part.000").await?);
/// ledger.record("a.bin.part.001").await?;
/// assert_eq!(ledger.entries().await.len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MemoryLedger {
    entries: RwLock<Vec<String>>,
}
impl MemoryLedger {
    pub fn with_entries(entries: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { entries: RwLock::new(entries.into_iter().map(Into::into).collect()) }
    }

    /// Snapshot of every recorded identifier, in order.
    pub async fn entries(&self) -> Vec<String> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn has(&self, id: &str) -> Result<bool> {
        Ok(self.entries.read().await.iter().any(|entry| entry == id))
    }

    async fn record(&self, id: &str) -> Result<()> {
        validate_identifier(id)?;
        self.entries.write().await.push(id.to_string());
        Ok(())
    }
}
