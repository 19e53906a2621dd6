//! Link-layer contract for serlink.
//!
//! A link layer delivers complete byte payloads reliably in both directions
//! and hands every inbound payload to a single callback on its own thread.
//! The session layer above it only ever talks to the [`LinkLayer`] trait.
//!
//! This crate also provides the connected [`LinkStream`] type and a Unix
//! domain socket listener/connector that concrete link layers build on.

pub mod error;
pub mod link;
pub mod stream;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use link::{DataHandler, LinkLayer, LogLevel, LogSink, StatusCode, StatusSink};
pub use stream::LinkStream;

#[cfg(unix)]
pub use uds::UnixDomainSocket;
