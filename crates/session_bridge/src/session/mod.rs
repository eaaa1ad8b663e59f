//! Session contexts and the registry that owns them.
//!
//! Every accepted connection gets exactly one [`SessionContext`], created by
//! the [`SessionCreation`] protocol and stored in the [`SessionRegistry`]
//! until the connection's [`DisconnectHandler`] fires.

pub mod disconnect;
pub mod factory;
pub mod registry;
pub mod route_back;
pub mod subscriptions;

pub use disconnect::DisconnectHandler;
pub use factory::{CreationOutcome, SessionCreation, SessionFactory};
pub use registry::{RegistryWriteScope, SessionRegistry};
pub use route_back::RouteBack;
pub use subscriptions::{MessagePublisher, SubscriptionId, Subscriptions};

use crate::connection::{ConnectionDetails, ConnectionId, MessageRouter};
use crate::messaging::InboundMessage;
use std::fmt;
use std::sync::Arc;

/// An application-level session produced by a [`SessionFactory`].
pub trait Session: Send + Sync + 'static {
    /// The connection this session was created for. Must never be zero.
    fn connection_id(&self) -> ConnectionId;
}

/// The registry state kept for one connection.
///
/// Owned by its registry entry. Other components only ever hold a transient
/// `Arc` obtained from [`SessionRegistry::lookup`].
pub struct SessionContext {
    details: ConnectionDetails,
    router: MessageRouter,
    publisher: MessagePublisher,
    session: Arc<dyn Session>,
    disconnect: DisconnectHandler,
}

impl SessionContext {
    pub fn new(
        details: ConnectionDetails,
        router: MessageRouter,
        publisher: MessagePublisher,
        session: Arc<dyn Session>,
        disconnect: DisconnectHandler,
    ) -> Self {
        Self {
            details,
            router,
            publisher,
            session,
            disconnect,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.details.connection_id
    }

    pub fn details(&self) -> &ConnectionDetails {
        &self.details
    }

    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    /// A subscription handle for this session's inbound messages.
    pub fn subscriptions(&self) -> Subscriptions {
        self.publisher.subscriptions()
    }

    pub fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }

    pub fn disconnect_handler(&self) -> &DisconnectHandler {
        &self.disconnect
    }

    /// Hands an inbound message to the session's subscribers.
    ///
    /// Returns how many subscribers received it.
    pub fn deliver(&self, message: &InboundMessage) -> usize {
        self.publisher.publish(message)
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("details", &self.details)
            .field("router", &self.router)
            .field("subscribers", &self.publisher.subscriber_count())
            .field("disconnected", &self.disconnect.is_fired())
            .finish()
    }
}
