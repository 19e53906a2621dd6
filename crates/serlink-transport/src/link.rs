use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// Asynchronous notices delivered to a status sink.
///
/// These are not tied to any particular call: a link layer reports
/// connection changes, and the session reports payloads it could not decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// The link is up and delivering payloads.
    ConnectionActive,
    /// The remote end went away.
    ConnectionLost,
    /// The link could not read from or allocate its underlying resources.
    IoResourcesUnavailable,
    /// A payload could not be transmitted.
    PktSendError,
    /// An inbound payload could not be decoded.
    PktDecodeError,
}

impl StatusCode {
    /// Stable name used in logs and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            StatusCode::ConnectionActive => "CONNECTION_ACTIVE",
            StatusCode::ConnectionLost => "CONNECTION_LOST",
            StatusCode::IoResourcesUnavailable => "IO_RESOURCES_UNAVAILABLE",
            StatusCode::PktSendError => "PKT_SEND_ERROR",
            StatusCode::PktDecodeError => "PKT_DECODE_ERROR",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a message delivered to a log sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

/// Receives asynchronous status notices. May be called from any thread.
pub type StatusSink = Arc<dyn Fn(StatusCode, &str) + Send + Sync>;

/// Receives diagnostic text. May be called from any thread.
pub type LogSink = Arc<dyn Fn(LogLevel, &str) + Send + Sync>;

/// Receives every complete inbound payload, on the link layer's own thread.
pub type DataHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Reliable delivery of complete byte payloads.
///
/// Implementations own their I/O threads. After a successful [`open`],
/// every complete inbound payload is passed to the `on_data` handler exactly
/// once, in arrival order. After [`close`] returns, `on_data` is no longer
/// invoked.
///
/// [`open`]: LinkLayer::open
/// [`close`]: LinkLayer::close
pub trait LinkLayer: Send {
    /// Bring the link up and start delivering inbound payloads.
    fn open(&mut self, status: StatusSink, on_data: DataHandler, log: LogSink) -> Result<()>;

    /// Transmit one complete payload.
    fn send(&mut self, payload: &[u8]) -> Result<()>;

    /// Tear the link down and stop delivering inbound payloads.
    fn close(&mut self) -> Result<()>;
}

impl<L: LinkLayer + ?Sized> LinkLayer for Box<L> {
    fn open(&mut self, status: StatusSink, on_data: DataHandler, log: LogSink) -> Result<()> {
        (**self).open(status, on_data, log)
    }

    fn send(&mut self, payload: &[u8]) -> Result<()> {
        (**self).send(payload)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recording {
        sent: Vec<Vec<u8>>,
        open: bool,
    }

    impl LinkLayer for Recording {
        fn open(&mut self, status: StatusSink, _on_data: DataHandler, _log: LogSink) -> Result<()> {
            self.open = true;
            status(StatusCode::ConnectionActive, "up");
            Ok(())
        }

        fn send(&mut self, payload: &[u8]) -> Result<()> {
            self.sent.push(payload.to_vec());
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            self.open = false;
            Ok(())
        }
    }

    #[test]
    fn boxed_link_forwards_calls() {
        let notices = Arc::new(Mutex::new(Vec::new()));
        let sink = notices.clone();
        let mut link: Box<dyn LinkLayer> = Box::new(Recording::default());

        link.open(
            Arc::new(move |code, _msg| sink.lock().unwrap().push(code)),
            Arc::new(|_data| {}),
            Arc::new(|_level, _msg| {}),
        )
        .unwrap();
        link.send(b"\x00ping").unwrap();
        link.close().unwrap();

        assert_eq!(*notices.lock().unwrap(), vec![StatusCode::ConnectionActive]);
    }

    #[test]
    fn status_code_names_are_stable() {
        assert_eq!(StatusCode::PktDecodeError.to_string(), "PKT_DECODE_ERROR");
        assert_eq!(StatusCode::ConnectionLost.as_str(), "CONNECTION_LOST");
    }

    #[test]
    fn log_levels_order_by_severity() {
        assert!(LogLevel::Warning < LogLevel::Error);
        assert!(LogLevel::Trace < LogLevel::Fatal);
        assert_eq!(LogLevel::Warning.to_string(), "warning");
    }
}
