use std::path::PathBuf;

/// Errors reported by link layers and their underlying streams.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the link stream.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// `open` was called on a link that is already open.
    #[error("link already open")]
    AlreadyOpen,

    /// The link is not open.
    #[error("link not open")]
    NotOpen,

    /// The link cannot be reopened (its one-shot stream was consumed).
    #[error("link exhausted: {0}")]
    Exhausted(&'static str),

    /// Payload could not be encoded or sent by the link.
    #[error("link send failed: {0}")]
    Send(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;
