//! Payload tags.
//!
//! Every link payload starts with a one-byte tag. Commands are tagged by
//! the caller; inbound payloads are routed by [`PacketKind::inbound`].

/// Command to the controller.
pub const COMMAND: u8 = 0;

/// Response to the command currently in flight.
pub const RESPONSE: u8 = 1;

/// Unsolicited event from the controller.
pub const EVENT: u8 = 2;

/// Direct test mode command.
pub const DTM_COMMAND: u8 = 3;

/// Direct test mode response. Not routed by the session.
pub const DTM_RESPONSE: u8 = 4;

/// Controller reset request.
pub const RESET_COMMAND: u8 = 5;

/// Classification of an inbound payload by its tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    /// Incoming response.
    Response,
    /// Incoming event.
    Event,
    /// Any other incoming tag. Ignored.
    Unknown(u8),
}

impl PacketKind {
    /// Classify the tag of an inbound payload.
    pub fn inbound(tag: u8) -> Self {
        match tag {
            RESPONSE => PacketKind::Response,
            EVENT => PacketKind::Event,
            other => PacketKind::Unknown(other),
        }
    }

    /// The tag byte on the wire.
    pub fn tag(self) -> u8 {
        match self {
            PacketKind::Unknown(tag) => tag,
            PacketKind::Response => RESPONSE,
            PacketKind::Event => EVENT,
        }
    }
}

/// Human-readable name for a tag byte.
pub fn tag_name(tag: u8) -> &'static str {
    match tag {
        COMMAND => "COMMAND",
        RESPONSE => "RESPONSE",
        EVENT => "EVENT",
        DTM_COMMAND => "DTM_COMMAND",
        DTM_RESPONSE => "DTM_RESPONSE",
        RESET_COMMAND => "RESET_COMMAND",
        _ => "UNKNOWN",
    }
}

/// Build `[tag][body]`.
pub fn tagged(tag: u8, body: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(body.len() + 1);
    payload.push(tag);
    payload.extend_from_slice(body);
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_response_and_event_are_routed() {
        assert_eq!(PacketKind::inbound(RESPONSE), PacketKind::Response);
        assert_eq!(PacketKind::inbound(EVENT), PacketKind::Event);
        assert_eq!(PacketKind::inbound(COMMAND), PacketKind::Unknown(COMMAND));
        assert_eq!(PacketKind::inbound(DTM_RESPONSE), PacketKind::Unknown(DTM_RESPONSE));
        assert_eq!(PacketKind::inbound(0xFF), PacketKind::Unknown(0xFF));
    }

    #[test]
    fn tag_is_prepended() {
        assert_eq!(tagged(RESET_COMMAND, b""), vec![RESET_COMMAND]);
        assert_eq!(tagged(COMMAND, &[0xAA, 0xBB]), vec![COMMAND, 0xAA, 0xBB]);
        assert_eq!(PacketKind::inbound(7).tag(), 7);
        assert_eq!(PacketKind::Event.tag(), EVENT);
    }

    #[test]
    fn names() {
        assert_eq!(tag_name(EVENT), "EVENT");
        assert_eq!(tag_name(42), "UNKNOWN");
    }
}
