//! Message type definitions for inbound traffic.

use crate::connection::ConnectionId;

/// A raw inbound payload tagged with the connection it arrived on.
///
/// The payload is opaque to the bridge; decoding it is up to the session
/// or the sessionless handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// The connection the payload was received from
    pub connection_id: ConnectionId,

    /// The raw payload bytes
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(connection_id: ConnectionId, payload: Vec<u8>) -> Self {
        Self {
            connection_id,
            payload,
        }
    }

    /// The payload as UTF-8 text, if it is valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}
