//! Read-only lookup of outbound routes for connections.
//!
//! This module provides the [`SendServiceSelector`], which bridges outbound
//! application code and the session registry. It never mutates the registry
//! and never holds a router beyond the call that asked for it.

use super::{ConnectionId, MessageRouter};
use crate::error::BridgeError;
use crate::session::SessionRegistry;
use std::sync::Arc;
use tracing::{debug, trace};

/// Resolves connection ids to their outbound routers.
///
/// "Unavailable" is a normal outcome here: it happens whenever a connection
/// disconnects between composing a message and sending it. Callers should
/// drop, queue or retry rather than treat it as fatal.
#[derive(Clone, Debug)]
pub struct SendServiceSelector {
    /// Registry consulted on every lookup
    registry: Arc<SessionRegistry>,
}

impl SendServiceSelector {
    /// Creates a selector over the given registry.
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the router for `connection_id`, or `None` if no session is registered.
    pub fn get_router_service(&self, connection_id: ConnectionId) -> Option<MessageRouter> {
        self.registry
            .lookup(connection_id)
            .map(|context| context.router().clone())
    }

    /// Sends a payload to one connection.
    ///
    /// Returns [`BridgeError::Unavailable`] if the connection has no session.
    pub fn send_to_connection(
        &self,
        connection_id: ConnectionId,
        payload: impl Into<Vec<u8>>,
    ) -> Result<(), BridgeError> {
        let router = self
            .get_router_service(connection_id)
            .ok_or(BridgeError::Unavailable(connection_id))?;
        trace!("📤 Sending to connection {}", connection_id);
        router.send(payload)
    }

    /// Sends the same payload to every registered connection.
    ///
    /// Routers are collected under the registry read lock and used after it
    /// is released. Returns the number of connections the payload was queued for.
    pub fn broadcast(&self, payload: &[u8]) -> usize {
        let routers: Vec<MessageRouter> = self
            .registry
            .snapshot()
            .iter()
            .map(|context| context.router().clone())
            .collect();

        let mut delivered = 0;
        for router in routers {
            match router.send(payload.to_vec()) {
                Ok(()) => delivered += 1,
                Err(e) => trace!("Skipping connection {} during broadcast: {}", router.connection_id(), e),
            }
        }

        debug!("📡 Broadcasted message to {} connections", delivered);
        delivered
    }

    /// Whether `connection_id` currently has a registered session.
    pub fn is_connection_active(&self, connection_id: ConnectionId) -> bool {
        self.registry.contains_key(connection_id)
    }
}
