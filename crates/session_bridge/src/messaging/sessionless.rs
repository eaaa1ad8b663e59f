//! Handling of inbound messages that have no registered session.

use super::InboundMessage;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Receives every inbound message whose connection id has no session.
///
/// That covers connections whose session has not been created yet and
/// connections whose session was already removed. Each such message reaches
/// the handler exactly once, in queue order.
pub trait SessionlessHandler: Send + Sync {
    fn handle_sessionless(&self, message: InboundMessage);
}

impl<F> SessionlessHandler for F
where
    F: Fn(InboundMessage) + Send + Sync,
{
    fn handle_sessionless(&self, message: InboundMessage) {
        self(message)
    }
}

/// Default handler: logs the message and counts it.
#[derive(Debug, Default)]
pub struct LoggingSessionlessHandler {
    handled: AtomicU64,
}

impl LoggingSessionlessHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handled(&self) -> u64 {
        self.handled.load(Ordering::Relaxed)
    }
}

impl SessionlessHandler for LoggingSessionlessHandler {
    fn handle_sessionless(&self, message: InboundMessage) {
        self.handled.fetch_add(1, Ordering::Relaxed);
        debug!(
            "📭 {} byte message for connection {} has no session (not created yet or already closed)",
            message.payload.len(),
            message.connection_id
        );
    }
}
