//! Sweep for chunks left behind by an interrupted run.

use crate::engine::{Engine, TransferEvent};
use crate::error::{ErrorKind, Result};
use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use partpush_chunk::{CHUNK_PATTERN, Chunk};

impl Engine {
    /// Streams [`TransferEvent`]s while sending every untracked file in the
    /// working tree that looks like a chunk.
    ///
    /// Chunks that were split (or staged) by a run that never got as far as a
    /// successful push show up as untracked files. Each one goes through the
    /// same per-chunk routine as [`transfer`](Engine::transfer), ledger check
    /// and retries included.
    pub fn rewrap(&self) -> impl Stream<Item = Result<TransferEvent>> + '_ {
        stream!({
            let untracked = match self.collaborator.list_untracked(&CHUNK_PATTERN).await.or_raise(|| ErrorKind::Collaborator) {
                Ok(paths) => paths,
                Err(e) => {
                    yield Err(e);
                    return;
                },
            };
            let chunks: Vec<Chunk> = untracked.into_iter().filter_map(Chunk::from_path).collect();
            tracing::debug!(strays = chunks.len(), "Untracked chunks found");
            for await event in self.transfer(chunks) {
                yield event;
            }
        })
    }
}
