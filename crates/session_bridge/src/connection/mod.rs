//! Connection-level types shared by every other component.
//!
//! This module defines the raw connection abstraction handed over by the
//! network engine, the id allocator, the outbound router bound to a raw
//! connection, and the read-only selector used by outbound code.

pub mod allocator;
pub mod details;
pub mod router;
pub mod selector;

pub use allocator::ConnectionIdAllocator;
pub use details::ConnectionDetails;
pub use router::MessageRouter;
pub use selector::SendServiceSelector;

use crate::error::BridgeError;
use std::net::SocketAddr;

/// Type alias for connection identifiers.
///
/// Connection ids are assigned by the [`ConnectionIdAllocator`], are never
/// zero for a registered session, and are not reused while registered.
pub type ConnectionId = usize;

/// A live transport connection as seen by the bridge.
///
/// Implemented by the network engine. All methods may be called from either
/// the network thread or the host thread and must not block on network I/O.
pub trait RawConnection: Send + Sync {
    /// The remote network address of the peer.
    fn remote_addr(&self) -> SocketAddr;

    /// Queues a payload for delivery to the peer.
    fn send(&self, payload: Vec<u8>) -> Result<(), BridgeError>;

    /// Closes the connection. Closing an already closed connection is a no-op.
    fn close(&self, reason: Option<String>);

    /// Whether the connection still accepts outbound payloads.
    fn is_open(&self) -> bool;
}
