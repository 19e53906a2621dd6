use std::time::Duration;

use serlink_transport::TransportError;

/// Errors returned by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// `open` was called on a session that is not closed.
    #[error("session already open")]
    AlreadyOpen,

    /// `close` was called on a session that is not open.
    #[error("session already closed")]
    AlreadyClosed,

    /// The operation is not valid in the session's current state.
    #[error("invalid session state: {0}")]
    InvalidState(&'static str),

    /// No response arrived before the response timeout.
    #[error("no response received within {0:?}")]
    NoResponse(Duration),

    /// The link layer failed; the error is passed through unchanged.
    #[error(transparent)]
    Link(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
