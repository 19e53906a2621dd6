use std::sync::Arc;

use serlink_transport::{LogLevel, LogSink, StatusSink};

/// Receives each decoded event, on the session's dispatch thread.
pub type EventSink<E> = Arc<dyn Fn(E) + Send + Sync>;

/// The callbacks registered by one `open`.
///
/// A fresh set is built on every open and shared by the demultiplexer and
/// the dispatch thread of that open only.
pub(crate) struct Sinks<E> {
    pub(crate) status: StatusSink,
    pub(crate) event: EventSink<E>,
    pub(crate) log: LogSink,
}

impl<E> Sinks<E> {
    pub(crate) fn report(&self, level: LogLevel, message: &str) {
        (self.log)(level, message);
    }
}
