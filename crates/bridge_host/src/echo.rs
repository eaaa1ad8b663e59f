//! Demonstration application: every session echoes what it receives.

use session_bridge::{
    ConnectionDetails, ConnectionId, DisconnectHandler, MessageRouter, RouteBack, Session,
    SessionFactory, Subscriptions,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// A connected echo client.
pub struct EchoSession {
    connection_id: ConnectionId,
    remote_addr: SocketAddr,
    echoed: AtomicU64,
}

impl EchoSession {
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Number of messages sent back so far.
    pub fn echoed(&self) -> u64 {
        self.echoed.load(Ordering::Relaxed)
    }
}

impl Session for EchoSession {
    fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }
}

/// Creates an [`EchoSession`] for every connection.
#[derive(Debug, Default)]
pub struct EchoFactory {
    sessions_created: AtomicU64,
}

impl EchoFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionFactory for EchoFactory {
    fn create_session(
        &self,
        _router: MessageRouter,
        details: &ConnectionDetails,
        subscriptions: Subscriptions,
        disconnect: DisconnectHandler,
        route_back: RouteBack,
    ) -> Option<Arc<dyn Session>> {
        let session = Arc::new(EchoSession {
            connection_id: details.connection_id,
            remote_addr: details.remote_addr,
            echoed: AtomicU64::new(0),
        });

        let echo = session.clone();
        subscriptions.subscribe(move |message| {
            if let Some(text) = message.text() {
                debug!("💬 Echoing {:?} to connection {}", text, message.connection_id);
            }
            // The client may already be gone; dropping the echo is fine then.
            match route_back.send(message.payload.clone()) {
                Ok(()) => {
                    echo.echoed.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => debug!("Echo to connection {} dropped: {}", echo.connection_id, e),
            }
        });

        let closing = session.clone();
        disconnect.on_disconnect(move |connection_id| {
            info!(
                "👋 Echo session {} ({}) closed after {} message(s)",
                connection_id,
                closing.remote_addr,
                closing.echoed()
            );
        });

        let created = self.sessions_created.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            "🎉 Echo session {} created for {} at {} ({} so far)",
            details.connection_id,
            details.remote_addr,
            details.connected_at_secs(),
            created
        );
        Some(session)
    }
}
