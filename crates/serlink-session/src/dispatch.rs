use parking_lot::MutexGuard;
use serlink_transport::{LogLevel, StatusCode};
use tracing::{debug, error, trace};

use crate::decoder::EventDecoder;
use crate::queue::EventQueue;
use crate::sinks::Sinks;

/// Body of the session's event dispatch thread.
///
/// The queue lock is held from the first instruction until the first wait,
/// so `open` (which holds the lock while spawning) cannot observe "ready"
/// before this thread is parked where a stop signal reaches it.
pub(crate) fn run<D: EventDecoder>(events: &EventQueue, decoder: &D, sinks: &Sinks<D::Event>) {
    let mut queue = events.lock();

    let stale = queue.stale.min(queue.entries.len());
    queue.entries.drain(..stale);
    queue.stale = 0;
    if stale > 0 {
        debug!(count = stale, "discarded events left from previous session");
    }

    queue.ready = true;
    events.ready.notify_all();

    while queue.processing {
        events
            .wake
            .wait_while(&mut queue, |queue| queue.processing && queue.entries.is_empty());

        while queue.processing {
            let Some(raw) = queue.entries.pop_front() else {
                break;
            };
            // Producers keep queueing while this event is decoded and handled.
            MutexGuard::unlocked(&mut queue, || deliver(decoder, sinks, &raw));
        }

        events.ready.notify_all();
    }

    debug!(
        remaining = queue.entries.len(),
        "event dispatch thread stopping"
    );
    events.ready.notify_all();
}

fn deliver<D: EventDecoder>(decoder: &D, sinks: &Sinks<D::Event>, raw: &[u8]) {
    match decoder.decode(raw) {
        Ok(event) => {
            trace!(size = raw.len(), "dispatching event");
            (sinks.event)(event);
        }
        Err(err) => {
            let message = format!("failed to decode event ({} bytes): {err}", raw.len());
            error!(size = raw.len(), error = %err, "failed to decode event");
            sinks.report(LogLevel::Error, &message);
            (sinks.status)(StatusCode::PktDecodeError, &message);
        }
    }
}
