//! Lazily resolved outbound path for one connection.

use super::SessionRegistry;
use crate::connection::{ConnectionId, MessageRouter};
use crate::error::BridgeError;
use std::fmt;
use std::sync::{Arc, Weak};

/// Addresses a connection by id instead of holding its session context.
///
/// Every call resolves through [`SessionRegistry::lookup`], so a route-back
/// service never keeps a context alive. Before the context is registered,
/// after it has been removed, or after the registry itself is released,
/// it resolves to "unavailable".
#[derive(Clone)]
pub struct RouteBack {
    connection_id: ConnectionId,
    registry: Weak<SessionRegistry>,
}

impl RouteBack {
    pub fn new(connection_id: ConnectionId, registry: &Arc<SessionRegistry>) -> Self {
        Self {
            connection_id,
            registry: Arc::downgrade(registry),
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Resolves the current router for this connection.
    pub fn router(&self) -> Option<MessageRouter> {
        let registry = self.registry.upgrade()?;
        let context = registry.lookup(self.connection_id)?;
        Some(context.router().clone())
    }

    /// Sends a payload back to this connection.
    pub fn send(&self, payload: impl Into<Vec<u8>>) -> Result<(), BridgeError> {
        self.router()
            .ok_or(BridgeError::Unavailable(self.connection_id))?
            .send(payload)
    }

    pub fn is_available(&self) -> bool {
        self.router().is_some()
    }
}

impl fmt::Debug for RouteBack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteBack")
            .field("connection_id", &self.connection_id)
            .finish()
    }
}
