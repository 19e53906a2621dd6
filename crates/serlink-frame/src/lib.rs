//! Length-prefixed payload framing for serlink links.
//!
//! Every payload crossing a link is framed as:
//! - A 2-byte magic number ("SL") for stream synchronization
//! - A 4-byte little-endian payload length
//!
//! [`FramedLink`] puts this framing behind the [`LinkLayer`] contract so a
//! session can run over any connected Unix socket.
//!
//! [`LinkLayer`]: serlink_transport::LinkLayer

pub mod codec;
pub mod error;
pub mod link;
pub mod reader;
pub mod writer;

pub use codec::{decode_frame, encode_frame, FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE, MAGIC};
pub use error::{FrameError, Result};
pub use link::FramedLink;
pub use reader::FrameReader;
pub use writer::FrameWriter;
