use std::marker::PhantomData;

use bytes::Bytes;
use serde::de::DeserializeOwned;

/// Why an event payload could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("empty event payload")]
    Empty,

    #[error("invalid JSON event: {0}")]
    Json(#[from] serde_json::Error),
}

/// Turns a raw event body (tag already stripped) into an application event.
///
/// Decoding runs on the session's dispatch thread, one payload at a time,
/// with no session locks held.
pub trait EventDecoder: Send + Sync + 'static {
    type Event: Send + 'static;

    fn decode(&self, raw: &[u8]) -> Result<Self::Event, DecodeError>;
}

/// Passes event bodies through as [`Bytes`]. Empty bodies are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawDecoder;

impl EventDecoder for RawDecoder {
    type Event = Bytes;

    fn decode(&self, raw: &[u8]) -> Result<Bytes, DecodeError> {
        if raw.is_empty() {
            return Err(DecodeError::Empty);
        }
        Ok(Bytes::copy_from_slice(raw))
    }
}

/// Decodes event bodies as JSON into `T`.
pub struct JsonDecoder<T> {
    _event: PhantomData<fn() -> T>,
}

impl<T> JsonDecoder<T> {
    pub fn new() -> Self {
        Self {
            _event: PhantomData,
        }
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for JsonDecoder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonDecoder")
            .field("event", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: DeserializeOwned + Send + 'static> EventDecoder for JsonDecoder<T> {
    type Event = T;

    fn decode(&self, raw: &[u8]) -> Result<T, DecodeError> {
        if raw.is_empty() {
            return Err(DecodeError::Empty);
        }
        Ok(serde_json::from_slice(raw)?)
    }
}
