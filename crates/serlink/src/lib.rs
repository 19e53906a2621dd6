//! Tagged command/response and event sessions over a controller link.
//!
//! serlink talks to an embedded controller over a single byte link: commands
//! go out one at a time and block for their response, while unsolicited
//! events are decoded and delivered in order on a dedicated thread.
//!
//! # Crate Structure
//!
//! - [`transport`]: the link contract ([`transport::LinkLayer`]) plus local
//!   stream and Unix socket plumbing
//! - [`frame`]: length-prefixed framing and [`frame::FramedLink`], a link
//!   layer over any connected stream
//! - [`session`]: the command/response and event session (behind the
//!   `session` feature, on by default)

/// Re-export transport types.
pub mod transport {
    pub use serlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use serlink_frame::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use serlink_session::*;
}
