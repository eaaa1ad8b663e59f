//! Outbound message routing bound to a raw connection.

use super::{ConnectionId, RawConnection};
use crate::error::BridgeError;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

/// Send capability for one connection.
///
/// A `MessageRouter` is cheap to clone. The registry owns one per session
/// context; the [`SendServiceSelector`](super::SendServiceSelector) and the
/// [`RouteBack`](crate::session::RouteBack) service hand out clones for the
/// duration of a send.
#[derive(Clone)]
pub struct MessageRouter {
    connection_id: ConnectionId,
    connection: Arc<dyn RawConnection>,
}

impl MessageRouter {
    /// Binds a router to a raw connection.
    pub fn new(connection_id: ConnectionId, connection: Arc<dyn RawConnection>) -> Self {
        Self {
            connection_id,
            connection,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.connection.remote_addr()
    }

    pub fn is_open(&self) -> bool {
        self.connection.is_open()
    }

    /// Sends a payload to the connection.
    ///
    /// Returns [`BridgeError::Unavailable`] once the connection has closed.
    pub fn send(&self, payload: impl Into<Vec<u8>>) -> Result<(), BridgeError> {
        if !self.connection.is_open() {
            return Err(BridgeError::Unavailable(self.connection_id));
        }
        self.connection.send(payload.into())
    }

    /// Closes the underlying raw connection.
    pub fn close(&self, reason: Option<String>) {
        self.connection.close(reason);
    }
}

impl fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageRouter")
            .field("connection_id", &self.connection_id)
            .field("remote_addr", &self.connection.remote_addr())
            .field("open", &self.connection.is_open())
            .finish()
    }
}
