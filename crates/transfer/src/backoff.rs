//! Retry delays for rejected pushes.

use std::time::Duration;

/// Linear backoff: `initial`, then `step` longer after every failure, never
/// more than `max`.
///
/// There is no attempt limit. A [`Schedule`] never runs out, so a push is
/// retried until it succeeds or the process is stopped.
///
/// ```
/// use partpush_transfer::Backoff;
/// use std::time::Duration;
///
/// let delays: Vec<_> = Backoff::default().schedule().take(4).map(|d| d.as_secs()).collect();
/// assert_eq!(delays, [10, 15, 20, 25]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub step: Duration,
    pub max: Duration,
}
impl Backoff {
    pub fn new(initial: Duration, step: Duration, max: Duration) -> Self {
        Self { initial, step, max }
    }

    /// Delays for one chunk's consecutive failures, starting again from
    /// `initial`.
    pub fn schedule(&self) -> Schedule {
        Schedule { next: self.initial.min(self.max), step: self.step, max: self.max }
    }
}
impl Default for Backoff {
    fn default() -> Self {
        Self { initial: Duration::from_secs(10), step: Duration::from_secs(5), max: Duration::from_secs(300) }
    }
}

/// Unbounded iterator of retry delays. `next()` always returns `Some`.
#[derive(Debug, Clone)]
pub struct Schedule {
    next: Duration,
    step: Duration,
    max: Duration,
}
impl Iterator for Schedule {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        let delay = self.next;
        self.next = self.next.saturating_add(self.step).min(self.max);
        Some(delay)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}
