//! Inbound message publication for a single session.

use crate::messaging::InboundMessage;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identifies one subscription so it can be removed later.
pub type SubscriptionId = u64;

type MessageHandler = Arc<dyn Fn(&InboundMessage) + Send + Sync>;

#[derive(Default)]
struct SubscriberList {
    handlers: Mutex<Vec<(SubscriptionId, MessageHandler)>>,
    next_id: AtomicU64,
}

/// Owner side of a session's inbound channel.
///
/// Kept in the session context; the dispatch loop publishes through it.
#[derive(Clone, Default)]
pub struct MessagePublisher {
    subscribers: Arc<SubscriberList>,
}

/// Application side of a session's inbound channel.
///
/// Handed to the session factory so the session can register handlers.
#[derive(Clone)]
pub struct Subscriptions {
    subscribers: Arc<SubscriberList>,
}

impl MessagePublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// The subscription surface tied to this publisher.
    pub fn subscriptions(&self) -> Subscriptions {
        Subscriptions {
            subscribers: self.subscribers.clone(),
        }
    }

    /// Calls every current handler with `message`, in subscription order.
    ///
    /// Handlers run after the subscriber lock is released, so a handler may
    /// subscribe or unsubscribe without deadlocking. Returns the number of
    /// handlers called.
    pub fn publish(&self, message: &InboundMessage) -> usize {
        let handlers: Vec<MessageHandler> = self
            .subscribers
            .handlers
            .lock()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();

        for handler in &handlers {
            handler(message);
        }
        handlers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.handlers.lock().len()
    }
}

impl Subscriptions {
    /// Registers a handler for every message delivered to the session.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        let id = self.subscribers.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .handlers
            .lock()
            .push((id, Arc::new(handler)));
        id
    }

    /// Removes a handler. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.subscribers.handlers.lock();
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }
}
