use crate::backoff::Backoff;
use crate::error::{ErrorKind, Result};
use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use partpush_chunk::Chunk;
use partpush_ledger::LedgerHandle;
use partpush_vcs::{CollaboratorHandle, CommitOutcome, PushOutcome};
use std::time::Duration;

pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_BRANCH: &str = "main";

/// Progress events emitted by [`Engine::transfer`] and
/// [`Engine::rewrap`](Engine::rewrap).
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started): exactly once, with the number of chunks.
/// 2. Per chunk, in index order: zero or more
///    [`PushFailed`](Self::PushFailed), then exactly one of
///    [`Skipped`](Self::Skipped), [`NothingToCommit`](Self::NothingToCommit)
///    or [`Transferred`](Self::Transferred).
/// 3. [`Complete`](Self::Complete): exactly once.
///
/// A fatal error terminates the stream early, in which case
/// [`Complete`](Self::Complete) is never emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    /// Transfer has begun.
    Started(u64),
    /// The chunk is already in the ledger; nothing was sent.
    Skipped(String),
    /// The collaborator had nothing to commit for the chunk. It is not
    /// recorded and the engine moves on.
    NothingToCommit(String),
    /// A push was rejected. The commit has been undone and the chunk
    /// unstaged; it will be sent again after `retry_in`.
    PushFailed { chunk: String, attempt: u32, retry_in: Duration, reason: String },
    /// The chunk reached the remote and has been recorded in the ledger.
    Transferred { chunk: String, attempts: u32 },
    /// Every chunk has been dealt with.
    Complete,
}

/// Outcome of a single stage/commit/push attempt.
enum Attempt {
    Pushed,
    NothingToCommit,
    Rejected(String),
}

/// Sends chunks to the remote one at a time.
///
/// For every chunk not yet in the ledger the engine stages it, commits it
/// and pushes. A rejected push is rolled back (the commit undone, the chunk
/// unstaged) and the whole attempt repeated after a [`Backoff`] delay, for as
/// long as it takes. The chunk is recorded in the ledger only after a push
/// succeeds.
pub struct Engine {
    pub(crate) collaborator: CollaboratorHandle,
    pub(crate) ledger: LedgerHandle,
    backoff: Backoff,
    remote: String,
    branch: String,
}

impl Engine {
    pub fn new(collaborator: CollaboratorHandle, ledger: LedgerHandle) -> Self {
        Self {
            collaborator,
            ledger,
            backoff: Backoff::default(),
            remote: DEFAULT_REMOTE.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_target(mut self, remote: impl Into<String>, branch: impl Into<String>) -> Self {
        self.remote = remote.into();
        self.branch = branch.into();
        self
    }

    /// Streams [`TransferEvent`]s while sending `chunks` in the order given
    /// (callers pass them in index order).
    pub fn transfer(&self, chunks: Vec<Chunk>) -> impl Stream<Item = Result<TransferEvent>> + '_ {
        // `rustfmt` does not format macros that use braces. Wrap in parentheses!
        stream!({
            // Infallible: a usize (either 32- or 64-bit) will always fit in a u64.
            yield Ok(TransferEvent::Started(u64::try_from(chunks.len()).unwrap_or(0)));
            for chunk in chunks {
                for await event in self.send(chunk) {
                    let fatal = event.is_err();
                    yield event;
                    if fatal {
                        return;
                    }
                }
            }
            yield Ok(TransferEvent::Complete);
        })
    }

    /// Events for one chunk, ending with the event that settles it (or an
    /// error).
    pub(crate) fn send(&self, chunk: Chunk) -> impl Stream<Item = Result<TransferEvent>> + '_ {
        stream!({
            let id = chunk.id();
            match self.ledger.has(&id).await.or_raise(|| ErrorKind::Ledger) {
                Ok(true) => {
                    tracing::debug!(chunk = %id, "Chunk already in ledger");
                    yield Ok(TransferEvent::Skipped(id));
                    return;
                },
                Ok(false) => {},
                Err(e) => {
                    yield Err(e);
                    return;
                },
            }

            let mut schedule = self.backoff.schedule();
            let mut attempt: u32 = 0;
            loop {
                attempt = attempt.saturating_add(1);
                match self.attempt(&chunk, &id).await {
                    Ok(Attempt::Pushed) => {
                        if let Err(e) = self.ledger.record(&id).await.or_raise(|| ErrorKind::Ledger) {
                            yield Err(e);
                            return;
                        }
                        tracing::info!(chunk = %id, attempts = attempt, "Chunk transferred");
                        yield Ok(TransferEvent::Transferred { chunk: id, attempts: attempt });
                        return;
                    },
                    Ok(Attempt::NothingToCommit) => {
                        tracing::info!(chunk = %id, "Nothing to commit; moving on");
                        yield Ok(TransferEvent::NothingToCommit(id));
                        return;
                    },
                    Ok(Attempt::Rejected(reason)) => {
                        let retry_in = schedule.next().unwrap_or(self.backoff.max);
                        tracing::warn!(chunk = %id, attempt, delay_secs = retry_in.as_secs(), %reason, "Push failed; retrying");
                        yield Ok(TransferEvent::PushFailed { chunk: id.clone(), attempt, retry_in, reason });
                        tokio::time::sleep(retry_in).await;
                    },
                    Err(e) => {
                        yield Err(e);
                        return;
                    },
                }
            }
        })
    }

    async fn attempt(&self, chunk: &Chunk, id: &str) -> Result<Attempt> {
        let vcs = &self.collaborator;
        vcs.stage(&chunk.path).await.or_raise(|| ErrorKind::Collaborator)?;
        let message = format!("Add chunk {id}");
        let committed = vcs.commit(&chunk.path, &message).await.or_raise(|| ErrorKind::Collaborator)?;
        if committed == CommitOutcome::NothingToCommit {
            return Ok(Attempt::NothingToCommit);
        }
        match vcs.push(&self.remote, &self.branch).await.or_raise(|| ErrorKind::Collaborator)? {
            PushOutcome::Pushed => Ok(Attempt::Pushed),
            PushOutcome::Rejected(reason) => {
                vcs.undo_last_commit().await.or_raise(|| ErrorKind::Collaborator)?;
                vcs.unstage(&chunk.path).await.or_raise(|| ErrorKind::Collaborator)?;
                Ok(Attempt::Rejected(reason))
            },
        }
    }
}
