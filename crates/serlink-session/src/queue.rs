use std::collections::VecDeque;

use bytes::Bytes;
use parking_lot::{Condvar, Mutex, MutexGuard};

/// FIFO of raw event bodies plus the dispatch thread's control flags.
///
/// One lock guards the queue and the flags; `wake` is signalled towards the
/// dispatch thread, `ready` back towards `open`.
pub(crate) struct EventQueue {
    state: Mutex<QueueState>,
    pub(crate) wake: Condvar,
    pub(crate) ready: Condvar,
}

#[derive(Default)]
pub(crate) struct QueueState {
    pub(crate) entries: VecDeque<Bytes>,
    /// Cleared to stop the dispatch thread.
    pub(crate) processing: bool,
    /// Set by the dispatch thread once it can be signalled to stop.
    pub(crate) ready: bool,
    /// Leading entries that belong to a previous open/close cycle.
    pub(crate) stale: usize,
}

impl EventQueue {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            wake: Condvar::new(),
            ready: Condvar::new(),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock()
    }

    /// Append an event body and wake the dispatch thread. Never blocks on
    /// decoding.
    pub(crate) fn push(&self, body: Bytes) {
        let mut state = self.state.lock();
        state.entries.push_back(body);
        self.wake.notify_one();
    }

    /// Everything queued right now predates the next open.
    pub(crate) fn mark_stale(&self) {
        let mut state = self.state.lock();
        state.stale = state.entries.len();
    }

    /// Ask the dispatch thread to stop and wake it.
    pub(crate) fn stop(&self) {
        let mut state = self.state.lock();
        state.processing = false;
        self.wake.notify_all();
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().entries.len()
    }
}
