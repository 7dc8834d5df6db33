use crate::task::SuspendSignal;

use std::cell::RefCell;

thread_local! {
    /// Thread-local slot carrying the current suspension signal.
    ///
    /// Suspension futures (sleep, readable, writable) deposit their
    /// signal here just before returning `Pending`; the task stepper
    /// clears the slot before polling and takes whatever was deposited
    /// afterwards. Nested drivers (the timeout combinator) re-deposit
    /// the inner task's signal so the outer stepper still observes it.
    static SUSPEND_SLOT: RefCell<Option<SuspendSignal>> = const { RefCell::new(None) };
}

/// Clears the suspension slot ahead of a poll.
pub(crate) fn clear() {
    SUSPEND_SLOT.with(|slot| *slot.borrow_mut() = None);
}

/// Deposits the suspension signal for the poll in progress.
///
/// A later deposit during the same poll wins; only the innermost
/// suspension point of a poll is ever live.
pub(crate) fn deposit(signal: SuspendSignal) {
    SUSPEND_SLOT.with(|slot| *slot.borrow_mut() = Some(signal));
}

/// Takes the signal deposited by the poll that just returned `Pending`.
pub(crate) fn take() -> Option<SuspendSignal> {
    SUSPEND_SLOT.with(|slot| slot.borrow_mut().take())
}
