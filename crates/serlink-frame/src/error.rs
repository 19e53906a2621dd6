/// Errors that can occur while framing link payloads.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame header does not start with the expected magic.
    #[error("invalid frame magic (expected 0x534C \"SL\")")]
    InvalidMagic,

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;

impl From<serlink_transport::TransportError> for FrameError {
    fn from(err: serlink_transport::TransportError) -> Self {
        use serlink_transport::TransportError;

        match err {
            TransportError::Io(io) | TransportError::Accept(io) => FrameError::Io(io),
            TransportError::Bind { source, .. } | TransportError::Connect { source, .. } => {
                FrameError::Io(source)
            }
            other => FrameError::Io(std::io::Error::other(other.to_string())),
        }
    }
}

impl From<FrameError> for serlink_transport::TransportError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Io(io) => serlink_transport::TransportError::Io(io),
            other => serlink_transport::TransportError::Send(other.to_string()),
        }
    }
}
