//! # Session Bridge
//!
//! Connection-session bridging between a network thread and a host tick
//! loop. The bridge accepts raw connections from a network engine, asks an
//! application-supplied factory for a session per connection, and delivers
//! inbound messages to those sessions on the host thread, once per tick.
//!
//! ## Architecture Overview
//!
//! ### Core Components
//!
//! * **Session Registry** - Readers-writer guarded map from connection id to
//!   session context
//! * **Connection Id Allocator** - Monotonic ids that skip zero and ids still
//!   in use
//! * **Session Creation** - Builds per-connection services, calls the
//!   factory and registers the result
//! * **Send Service Selector** - Read-only outbound lookup by connection id
//! * **Dispatcher** - Drains the inbound queue and routes each message to its
//!   session or to the sessionless handler
//!
//! ### Threads
//!
//! The **network thread** runs a [`Transport`]. It accepts connections,
//! reports disconnects and enqueues inbound payloads through a
//! [`TransportSink`]. The **host thread** calls [`SessionBridge::poll`] once
//! per tick; every application handler runs there.
//!
//! ```rust,no_run
//! use session_bridge::{ConnectionDetails, DisconnectHandler, MessageRouter, RouteBack,
//!     ServerConfig, Session, SessionBridge, Subscriptions, WebSocketTransport, ConnectionId};
//! use std::sync::Arc;
//!
//! struct Player(ConnectionId);
//! impl Session for Player {
//!     fn connection_id(&self) -> ConnectionId { self.0 }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bridge = SessionBridge::builder()
//!     .config(ServerConfig::default())
//!     .session_factory(|_router: MessageRouter,
//!                       details: &ConnectionDetails,
//!                       subscriptions: Subscriptions,
//!                       _disconnect: DisconnectHandler,
//!                       route_back: RouteBack| -> Option<Arc<dyn Session>> {
//!         subscriptions.subscribe(move |message| {
//!             let _ = route_back.send(message.payload.clone());
//!         });
//!         Some(Arc::new(Player(details.connection_id)))
//!     })
//!     .build()?;
//!
//! let transport = WebSocketTransport::bind(bridge.config().bind_address)?;
//! let mut network = bridge.start_network(transport)?;
//! for _ in 0..100 {
//!     bridge.poll()?;
//!     std::thread::sleep(std::time::Duration::from_millis(50));
//! }
//! network.stop();
//! network.dispose();
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Errors are reported as [`BridgeError`]. Per-connection and per-message
//! failures are handled locally and never stop the dispatch loop or the
//! network thread. Errors and panics on the network thread go to a single
//! fatal handler.

pub use config::ServerConfig;
pub use connection::{
    ConnectionDetails, ConnectionId, ConnectionIdAllocator, MessageRouter, RawConnection,
    SendServiceSelector,
};
pub use error::BridgeError;
pub use messaging::{
    DispatchReport, InboundMessage, InboundQueue, LoggingSessionlessHandler, SessionlessHandler,
};
pub use server::{
    FatalHandler, NetworkThread, SessionBridge, SessionBridgeBuilder, Transport, TransportSink,
    WebSocketTransport,
};
pub use session::{
    CreationOutcome, DisconnectHandler, MessagePublisher, RegistryWriteScope, RouteBack, Session,
    SessionContext, SessionCreation, SessionFactory, SessionRegistry, SubscriptionId,
    Subscriptions,
};
pub use shutdown::ShutdownState;
pub use stats::BridgeStats;

pub mod config;
pub mod connection;
pub mod error;
pub mod messaging;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod stats;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::connection::{ConnectionDetails, ConnectionId, MessageRouter, RawConnection};
    use crate::error::BridgeError;
    use crate::messaging::InboundMessage;
    use crate::session::{DisconnectHandler, MessagePublisher, Session, SessionContext};
    use parking_lot::Mutex;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// In-memory raw connection recording everything sent to it.
    #[derive(Default)]
    pub struct MockConnection {
        sent: Mutex<Vec<Vec<u8>>>,
        close_reason: Mutex<Option<String>>,
        closed: AtomicBool,
    }

    impl MockConnection {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn sent(&self) -> Vec<Vec<u8>> {
            self.sent.lock().clone()
        }

        pub fn is_closed(&self) -> bool {
            self.closed.load(Ordering::Acquire)
        }

        pub fn close_reason(&self) -> Option<String> {
            self.close_reason.lock().clone()
        }
    }

    impl RawConnection for MockConnection {
        fn remote_addr(&self) -> SocketAddr {
            SocketAddr::from(([127, 0, 0, 1], 40000))
        }

        fn send(&self, payload: Vec<u8>) -> Result<(), BridgeError> {
            if self.is_closed() {
                return Err(BridgeError::Network("mock connection closed".to_string()));
            }
            self.sent.lock().push(payload);
            Ok(())
        }

        fn close(&self, reason: Option<String>) {
            if !self.closed.swap(true, Ordering::AcqRel) {
                *self.close_reason.lock() = reason;
            }
        }

        fn is_open(&self) -> bool {
            !self.is_closed()
        }
    }

    pub struct TestSession {
        connection_id: ConnectionId,
    }

    impl TestSession {
        pub fn new(connection_id: ConnectionId) -> Self {
            Self { connection_id }
        }
    }

    impl Session for TestSession {
        fn connection_id(&self) -> ConnectionId {
            self.connection_id
        }
    }

    pub fn context_with_raw(
        connection_id: ConnectionId,
        raw: Arc<MockConnection>,
    ) -> Arc<SessionContext> {
        let details = ConnectionDetails::new(connection_id, raw.remote_addr());
        Arc::new(SessionContext::new(
            details,
            MessageRouter::new(connection_id, raw),
            MessagePublisher::new(),
            Arc::new(TestSession::new(connection_id)),
            DisconnectHandler::new(connection_id),
        ))
    }

    pub fn context_for(connection_id: ConnectionId) -> Arc<SessionContext> {
        context_with_raw(connection_id, Arc::new(MockConnection::new()))
    }

    pub fn subscribe<F>(context: &SessionContext, handler: F)
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        context.subscriptions().subscribe(handler);
    }
}
