//! Session creation for newly accepted connections.
//!
//! This module contains the pluggable [`SessionFactory`] capability and the
//! [`SessionCreation`] protocol that wraps it: allocate an id, build the
//! per-connection services outside any lock, ask the factory for a session,
//! validate it, and register the resulting context.

use super::{
    DisconnectHandler, MessagePublisher, RouteBack, Session, SessionContext, SessionRegistry,
    Subscriptions,
};
use crate::connection::{
    ConnectionDetails, ConnectionId, ConnectionIdAllocator, MessageRouter, RawConnection,
};
use crate::error::BridgeError;
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, warn};

/// Application-supplied constructor for sessions.
///
/// Called synchronously on the network thread for every accepted
/// connection. Returning `None` rejects the connection; it is then closed
/// without anything being registered.
///
/// Closures with the matching signature implement this trait:
///
/// ```rust
/// use session_bridge::{ConnectionDetails, ConnectionId, DisconnectHandler, MessageRouter,
///     RouteBack, Session, SessionFactory, Subscriptions};
/// use std::sync::Arc;
///
/// struct Quiet(ConnectionId);
/// impl Session for Quiet {
///     fn connection_id(&self) -> ConnectionId { self.0 }
/// }
///
/// let factory = |_router: MessageRouter,
///                details: &ConnectionDetails,
///                _subscriptions: Subscriptions,
///                _disconnect: DisconnectHandler,
///                _route_back: RouteBack| -> Option<Arc<dyn Session>> {
///     Some(Arc::new(Quiet(details.connection_id)))
/// };
/// fn assert_factory(_: &impl SessionFactory) {}
/// assert_factory(&factory);
/// ```
pub trait SessionFactory: Send + Sync {
    fn create_session(
        &self,
        router: MessageRouter,
        details: &ConnectionDetails,
        subscriptions: Subscriptions,
        disconnect: DisconnectHandler,
        route_back: RouteBack,
    ) -> Option<Arc<dyn Session>>;
}

impl<F> SessionFactory for F
where
    F: Fn(
            MessageRouter,
            &ConnectionDetails,
            Subscriptions,
            DisconnectHandler,
            RouteBack,
        ) -> Option<Arc<dyn Session>>
        + Send
        + Sync,
{
    fn create_session(
        &self,
        router: MessageRouter,
        details: &ConnectionDetails,
        subscriptions: Subscriptions,
        disconnect: DisconnectHandler,
        route_back: RouteBack,
    ) -> Option<Arc<dyn Session>> {
        self(router, details, subscriptions, disconnect, route_back)
    }
}

/// Result of running the creation protocol for one raw connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationOutcome {
    /// A session was created and registered under this id.
    Registered(ConnectionId),
    /// The factory declined the connection. Nothing was registered.
    Rejected(ConnectionId),
}

/// Builds and registers session contexts.
///
/// Closing the raw connection after a rejection or an error is left to the
/// caller, which owns the transport-facing side of the exchange.
pub struct SessionCreation {
    registry: Arc<SessionRegistry>,
    allocator: Arc<ConnectionIdAllocator>,
    factory: Arc<dyn SessionFactory>,
}

impl SessionCreation {
    pub fn new(
        registry: Arc<SessionRegistry>,
        allocator: Arc<ConnectionIdAllocator>,
        factory: Arc<dyn SessionFactory>,
    ) -> Self {
        Self {
            registry,
            allocator,
            factory,
        }
    }

    /// Runs the creation protocol for a newly accepted raw connection.
    ///
    /// # Errors
    ///
    /// * [`BridgeError::AllocatorInvariantViolation`] if the produced session
    ///   reports connection id zero.
    /// * [`BridgeError::DuplicateConnection`] if the id is already registered.
    ///
    /// In both cases the registry is left unchanged.
    pub fn create(&self, raw: Arc<dyn RawConnection>) -> Result<CreationOutcome, BridgeError> {
        let connection_id = self.allocator.allocate(&self.registry);
        let details = ConnectionDetails::new(connection_id, raw.remote_addr());

        // Per-connection services are built without touching the registry lock.
        let router = MessageRouter::new(connection_id, raw);
        let publisher = MessagePublisher::new();
        let disconnect = DisconnectHandler::new(connection_id);
        let route_back = RouteBack::new(connection_id, &self.registry);

        let Some(session) = self.factory.create_session(
            router.clone(),
            &details,
            publisher.subscriptions(),
            disconnect.clone(),
            route_back,
        ) else {
            info!(
                "🚫 Session factory rejected connection {} from {}",
                connection_id, details.remote_addr
            );
            return Ok(CreationOutcome::Rejected(connection_id));
        };

        if session.connection_id() == 0 {
            error!(
                "💥 Session for connection {} from {} reported connection id 0 - refusing to register",
                connection_id, details.remote_addr
            );
            return Err(BridgeError::AllocatorInvariantViolation);
        }
        if session.connection_id() != connection_id {
            warn!(
                "⚠️ Session reports connection id {} but is registered under {}",
                session.connection_id(),
                connection_id
            );
        }

        // Wired before insertion so a close racing the insert still cleans up.
        let registry: Weak<SessionRegistry> = Arc::downgrade(&self.registry);
        disconnect.on_disconnect_first(move |id| {
            if let Some(registry) = registry.upgrade() {
                if registry.remove(id).is_some() {
                    info!("❌ Connection {} disconnected, session removed", id);
                }
            }
        });

        let context = Arc::new(SessionContext::new(
            details,
            router,
            publisher,
            session,
            disconnect.clone(),
        ));
        self.registry.add(connection_id, context)?;

        if disconnect.is_fired() {
            self.registry.remove(connection_id);
            debug!("Connection {} closed while its session was being registered", connection_id);
        }

        Ok(CreationOutcome::Registered(connection_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockConnection, TestSession};

    fn accept_all() -> Arc<dyn SessionFactory> {
        Arc::new(
            |_router: MessageRouter,
             details: &ConnectionDetails,
             _subscriptions: Subscriptions,
             _disconnect: DisconnectHandler,
             _route_back: RouteBack|
             -> Option<Arc<dyn Session>> {
                Some(Arc::new(TestSession::new(details.connection_id)))
            },
        )
    }

    fn creation(factory: Arc<dyn SessionFactory>) -> (Arc<SessionRegistry>, SessionCreation) {
        let registry = Arc::new(SessionRegistry::new());
        let creation = SessionCreation::new(
            registry.clone(),
            Arc::new(ConnectionIdAllocator::new()),
            factory,
        );
        (registry, creation)
    }

    #[test]
    fn test_accepted_connection_is_registered() {
        let (registry, creation) = creation(accept_all());
        let raw = Arc::new(MockConnection::new());

        let outcome = creation.create(raw.clone()).expect("creation should succeed");

        assert_eq!(outcome, CreationOutcome::Registered(1));
        let context = registry.lookup(1).expect("context should be registered");
        assert_eq!(context.details().remote_addr, raw.remote_addr());
        assert!(!raw.is_closed());
    }

    #[test]
    fn test_rejection_registers_nothing() {
        let factory: Arc<dyn SessionFactory> = Arc::new(
            |_: MessageRouter,
             _: &ConnectionDetails,
             _: Subscriptions,
             _: DisconnectHandler,
             _: RouteBack|
             -> Option<Arc<dyn Session>> { None },
        );
        let (registry, creation) = creation(factory);

        let outcome = creation
            .create(Arc::new(MockConnection::new()))
            .expect("rejection is not an error");

        assert_eq!(outcome, CreationOutcome::Rejected(1));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_zero_session_id_is_fatal() {
        let factory: Arc<dyn SessionFactory> = Arc::new(
            |_: MessageRouter,
             _: &ConnectionDetails,
             _: Subscriptions,
             _: DisconnectHandler,
             _: RouteBack|
             -> Option<Arc<dyn Session>> { Some(Arc::new(TestSession::new(0))) },
        );
        let (registry, creation) = creation(factory);

        let result = creation.create(Arc::new(MockConnection::new()));

        assert_eq!(result, Err(BridgeError::AllocatorInvariantViolation));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_mismatched_session_id_keeps_allocated_key() {
        let factory: Arc<dyn SessionFactory> = Arc::new(
            |_: MessageRouter,
             _: &ConnectionDetails,
             _: Subscriptions,
             _: DisconnectHandler,
             _: RouteBack|
             -> Option<Arc<dyn Session>> { Some(Arc::new(TestSession::new(42))) },
        );
        let (registry, creation) = creation(factory);

        let outcome = creation
            .create(Arc::new(MockConnection::new()))
            .expect("mismatch is not fatal");

        assert_eq!(outcome, CreationOutcome::Registered(1));
        assert!(registry.contains_key(1));
        assert!(!registry.contains_key(42));
    }

    #[test]
    fn test_disconnect_removes_registration() {
        let (registry, creation) = creation(accept_all());
        creation
            .create(Arc::new(MockConnection::new()))
            .expect("creation should succeed");

        let context = registry.lookup(1).expect("registered");
        assert!(context.disconnect_handler().fire());

        assert!(registry.lookup(1).is_none());
    }

    #[test]
    fn test_route_back_resolves_after_registration() {
        let captured = Arc::new(parking_lot::Mutex::new(None));
        let factory: Arc<dyn SessionFactory> = {
            let captured = captured.clone();
            Arc::new(
                move |_: MessageRouter,
                      details: &ConnectionDetails,
                      _: Subscriptions,
                      _: DisconnectHandler,
                      route_back: RouteBack|
                      -> Option<Arc<dyn Session>> {
                    assert!(!route_back.is_available());
                    *captured.lock() = Some(route_back);
                    Some(Arc::new(TestSession::new(details.connection_id)))
                },
            )
        };
        let (registry, creation) = creation(factory);
        let raw = Arc::new(MockConnection::new());
        creation.create(raw.clone()).expect("creation should succeed");

        let route_back = captured.lock().take().expect("factory captured route back");
        route_back.send("welcome").expect("route back should resolve");
        assert_eq!(raw.sent(), vec![b"welcome".to_vec()]);

        registry.remove(1);
        assert!(!route_back.is_available());
    }
}
