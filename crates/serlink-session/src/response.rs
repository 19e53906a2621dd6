use std::time::Instant;

use parking_lot::{Condvar, Mutex};

/// What the demultiplexer did with a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    /// Copied into the reply buffer, which now has the body's length.
    Copied,
    /// The reply buffer was too small; it was left untouched.
    TooLarge { capacity: usize },
    /// The command in flight did not supply a reply buffer.
    NoBuffer,
}

/// The single pending-response slot of a session.
///
/// Written by the demultiplexer, armed and drained by `send`. The reply
/// buffer is moved into the slot for the duration of the wait, so a response
/// that arrives after the caller gave up never touches the caller's memory.
pub(crate) struct ResponseSlot {
    pending: Mutex<Pending>,
    arrived: Condvar,
}

#[derive(Default)]
struct Pending {
    received: bool,
    buffer: Option<Vec<u8>>,
}

impl ResponseSlot {
    pub(crate) fn new() -> Self {
        Self {
            pending: Mutex::new(Pending::default()),
            arrived: Condvar::new(),
        }
    }

    /// Clear the received flag and hold `buffer` for the next response.
    pub(crate) fn arm(&self, buffer: Option<Vec<u8>>) {
        let mut pending = self.pending.lock();
        pending.received = false;
        pending.buffer = buffer;
    }

    /// Give the reply buffer back without waiting.
    pub(crate) fn disarm(&self) -> Option<Vec<u8>> {
        self.pending.lock().buffer.take()
    }

    /// Block until a response arrives or `deadline` passes.
    ///
    /// Returns whether a response arrived, and the reply buffer.
    pub(crate) fn wait_until(&self, deadline: Instant) -> (bool, Option<Vec<u8>>) {
        let mut pending = self.pending.lock();
        self.arrived
            .wait_while_until(&mut pending, |pending| !pending.received, deadline);
        (pending.received, pending.buffer.take())
    }

    /// Store a response body and wake the waiter.
    ///
    /// The waiter is woken even when the body cannot be stored: a response
    /// did arrive.
    pub(crate) fn deliver(&self, body: &[u8]) -> Delivery {
        let mut pending = self.pending.lock();
        let delivery = match pending.buffer.as_mut() {
            Some(buffer) if buffer.len() >= body.len() => {
                buffer[..body.len()].copy_from_slice(body);
                buffer.truncate(body.len());
                Delivery::Copied
            }
            Some(buffer) => Delivery::TooLarge {
                capacity: buffer.len(),
            },
            None => Delivery::NoBuffer,
        };
        pending.received = true;
        self.arrived.notify_one();
        delivery
    }
}
