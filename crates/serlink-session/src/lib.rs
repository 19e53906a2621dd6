//! Command/response and event multiplexing over a single link.
//!
//! A [`Session`] owns one [`LinkLayer`] and splits its payload stream into
//! two logical channels using the first byte of every payload:
//!
//! - commands go out tagged by the caller; the matching response wakes the
//!   blocked [`Session::send`] call (one command in flight at a time)
//! - events are queued as they arrive and delivered, decoded and in order,
//!   on a dedicated dispatch thread owned by the session
//!
//! [`LinkLayer`]: serlink_transport::LinkLayer

pub mod config;
pub mod decoder;
mod dispatch;
pub mod error;
pub mod packet;
mod queue;
mod response;
pub mod session;
mod sinks;

pub use config::{SessionConfig, DEFAULT_RESPONSE_TIMEOUT, DEFAULT_STARTUP_TIMEOUT};
pub use decoder::{DecodeError, EventDecoder, JsonDecoder, RawDecoder};
pub use error::{Result, SessionError};
pub use packet::{PacketKind, COMMAND, DTM_COMMAND, DTM_RESPONSE, EVENT, RESET_COMMAND, RESPONSE};
pub use session::{Session, SessionState};
pub use sinks::EventSink;

pub use serlink_transport::{LinkLayer, LogLevel, LogSink, StatusCode, StatusSink};
