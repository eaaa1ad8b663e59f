//! Bridge configuration types and defaults.
//!
//! This module contains the configuration structure used to initialize a
//! [`SessionBridge`](crate::SessionBridge) and its network thread.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Configuration structure for the session bridge.
///
/// Contains the network parameters handed to the transport as well as the
/// limits enforced while accepting connections and draining the inbound queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The socket address the transport binds to
    pub bind_address: SocketAddr,

    /// Maximum number of registered sessions; further accepts are rejected
    pub max_connections: usize,

    /// Host tick interval in milliseconds
    pub tick_interval_ms: u64,

    /// A drained batch larger than this is logged as a warning
    pub queue_warn_threshold: usize,

    /// Name given to the OS thread that runs the transport
    pub network_thread_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_connections: 1000,
            tick_interval_ms: 50, // 20 ticks per second by default
            queue_warn_threshold: 10_000,
            network_thread_name: "bridge-net".to_string(),
        }
    }
}
