//! Connection metadata passed to the session factory.

use super::ConnectionId;
use std::net::SocketAddr;
use std::time::SystemTime;

/// Describes a freshly accepted connection.
///
/// Built once by the session creation protocol and stored in the session
/// context for the lifetime of the registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDetails {
    /// The id assigned by the allocator
    pub connection_id: ConnectionId,

    /// The remote network address of the client
    pub remote_addr: SocketAddr,

    /// When this connection was accepted
    pub connected_at: SystemTime,
}

impl ConnectionDetails {
    /// Creates connection details stamped with the current time.
    pub fn new(connection_id: ConnectionId, remote_addr: SocketAddr) -> Self {
        Self {
            connection_id,
            remote_addr,
            connected_at: SystemTime::now(),
        }
    }

    /// Seconds since the Unix epoch at which the connection was accepted.
    pub fn connected_at_secs(&self) -> u64 {
        self.connected_at
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_connected_at_secs() {
        let mut details = ConnectionDetails::new(7, SocketAddr::from(([127, 0, 0, 1], 9000)));
        details.connected_at = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        assert_eq!(details.connected_at_secs(), 1_700_000_000);
    }
}
