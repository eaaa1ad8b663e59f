//! The owned bridge unit and its network-thread plumbing.
//!
//! * [`SessionBridge`] owns the registry, allocator, inbound queue and
//!   dispatcher for one running server instance.
//! * [`TransportSink`] is the event surface a network engine reports to.
//! * [`NetworkThread`] runs a [`Transport`] on a dedicated OS thread.
//! * [`WebSocketTransport`] is the bundled tokio-tungstenite engine.

pub mod bridge;
pub mod network;
pub mod transport;
pub mod websocket;

pub use bridge::{SessionBridge, SessionBridgeBuilder};
pub use network::NetworkThread;
pub use transport::{FatalHandler, Transport, TransportSink};
pub use websocket::WebSocketTransport;
