//! The event surface between a network engine and the bridge.

use super::bridge::BridgeCore;
use crate::connection::{ConnectionId, RawConnection};
use crate::error::BridgeError;
use crate::messaging::InboundMessage;
use crate::session::CreationOutcome;
use crate::shutdown::ShutdownState;
use crate::stats::BridgeCounters;
use std::sync::Arc;
use tracing::{error, info, trace, warn};

/// Receives errors and panics from the network thread.
pub type FatalHandler = Arc<dyn Fn(&BridgeError) + Send + Sync>;

/// A network engine that can be run on the bridge's network thread.
///
/// `run` blocks until the engine stops. It should return once `shutdown`
/// has been initiated, after which no more events may be reported to the
/// sink.
pub trait Transport: Send + 'static {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn run(self: Box<Self>, sink: TransportSink, shutdown: ShutdownState)
        -> Result<(), BridgeError>;
}

/// Handle through which a transport reports accepts, disconnects and
/// inbound payloads.
///
/// Every method is meant to be called from the network thread only.
#[derive(Clone)]
pub struct TransportSink {
    core: Arc<BridgeCore>,
}

impl TransportSink {
    pub(crate) fn new(core: Arc<BridgeCore>) -> Self {
        Self { core }
    }

    /// Runs session creation for a newly accepted connection.
    ///
    /// Returns the id the session was registered under. When `None` is
    /// returned the raw connection has already been closed.
    pub fn on_accept(&self, raw: Arc<dyn RawConnection>) -> Option<ConnectionId> {
        let counters = &self.core.counters;
        let limit = self.core.config.max_connections;
        if self.core.registry.len() >= limit {
            warn!(
                "🚫 Rejecting connection from {}: {}",
                raw.remote_addr(),
                BridgeError::ConnectionLimit(limit)
            );
            BridgeCounters::increment(&counters.sessions_rejected);
            raw.close(Some("connection limit reached".to_string()));
            return None;
        }

        match self.core.creation.create(raw.clone()) {
            Ok(CreationOutcome::Registered(connection_id)) => {
                BridgeCounters::increment(&counters.sessions_created);
                info!(
                    "🔗 Connection {} from {} registered",
                    connection_id,
                    raw.remote_addr()
                );
                Some(connection_id)
            }
            Ok(CreationOutcome::Rejected(_)) => {
                BridgeCounters::increment(&counters.sessions_rejected);
                raw.close(Some("session rejected".to_string()));
                None
            }
            Err(e) => {
                BridgeCounters::increment(&counters.sessions_failed);
                error!("❌ Session creation for {} failed: {}", raw.remote_addr(), e);
                raw.close(Some("session creation failed".to_string()));
                None
            }
        }
    }

    /// Reports that a connection went away.
    ///
    /// Fires the session's disconnect handler, which removes the registry
    /// entry. Unknown ids are ignored.
    pub fn on_disconnect(&self, connection_id: ConnectionId) {
        match self.core.registry.lookup(connection_id) {
            Some(context) => {
                context.disconnect_handler().fire();
            }
            None => trace!("Disconnect for unregistered connection {}", connection_id),
        }
    }

    /// Queues an inbound payload for the next poll.
    pub fn on_message(&self, connection_id: ConnectionId, payload: Vec<u8>) {
        self.core
            .queue
            .push(InboundMessage::new(connection_id, payload));
        BridgeCounters::increment(&self.core.counters.messages_enqueued);
    }
}
