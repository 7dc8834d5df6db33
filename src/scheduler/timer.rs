use crate::cancel::CancellationToken;

use std::cmp::Ordering;
use std::time::Instant;

/// An entry in the event loop's timer queue.
///
/// `TimerEntry` represents a parked task due to be resumed at a
/// specific deadline. Entries live in a `BinaryHeap` ordered by
/// deadline, with an insertion sequence number breaking ties so that
/// timers sharing a deadline resume in insertion order.
pub(crate) struct TimerEntry {
    /// The time at which the timer should fire.
    pub(crate) wake_at: Instant,

    /// Insertion sequence number; keeps equal deadlines stable.
    pub(crate) seq: u64,

    /// Index of the parked task in the event loop's task set.
    pub(crate) key: usize,

    /// Cancellation token carried by the underlying sleep, if any.
    pub(crate) token: Option<CancellationToken>,

    /// When the task parked; feeds resume-latency metrics.
    pub(crate) since: Instant,
}

impl TimerEntry {
    /// Whether the parked sleep's token has been cancelled.
    ///
    /// A cancelled timer is requeued early so the task itself observes
    /// the cancellation at its next step.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    /// Two timer entries are equal if deadline and sequence match.
    fn eq(&self, other: &Self) -> bool {
        self.wake_at == other.wake_at && self.seq == other.seq
    }
}

impl Ord for TimerEntry {
    /// Orders timer entries by deadline, then insertion sequence.
    ///
    /// Note that the comparison is **reversed** so that a
    /// `BinaryHeap<TimerEntry>` behaves as a min-heap, where the
    /// earliest deadline is popped first.
    fn cmp(&self, other: &Self) -> Ordering {
        (other.wake_at, other.seq).cmp(&(self.wake_at, self.seq))
    }
}

impl PartialOrd for TimerEntry {
    /// Partial ordering consistent with [`Ord`].
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
