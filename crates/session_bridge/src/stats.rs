//! Counters describing bridge activity.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time view of bridge activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeStats {
    /// Sessions created and registered
    pub sessions_created: u64,
    /// Connections declined by the factory or the connection limit
    pub sessions_rejected: u64,
    /// Connections whose creation failed with an error
    pub sessions_failed: u64,
    /// Messages pushed by the network thread
    pub messages_enqueued: u64,
    /// Messages handed to a session
    pub messages_delivered: u64,
    /// Messages handed to the sessionless handler
    pub messages_sessionless: u64,
    /// Completed poll calls
    pub polls: u64,
    /// Sessions currently registered
    pub active_sessions: usize,
}

#[derive(Debug, Default)]
pub(crate) struct BridgeCounters {
    pub(crate) sessions_created: AtomicU64,
    pub(crate) sessions_rejected: AtomicU64,
    pub(crate) sessions_failed: AtomicU64,
    pub(crate) messages_enqueued: AtomicU64,
    pub(crate) messages_delivered: AtomicU64,
    pub(crate) messages_sessionless: AtomicU64,
    pub(crate) polls: AtomicU64,
}

impl BridgeCounters {
    pub(crate) fn increment(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add(counter: &AtomicU64, amount: u64) {
        counter.fetch_add(amount, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, active_sessions: usize) -> BridgeStats {
        BridgeStats {
            sessions_created: self.sessions_created.load(Ordering::Relaxed),
            sessions_rejected: self.sessions_rejected.load(Ordering::Relaxed),
            sessions_failed: self.sessions_failed.load(Ordering::Relaxed),
            messages_enqueued: self.messages_enqueued.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            messages_sessionless: self.messages_sessionless.load(Ordering::Relaxed),
            polls: self.polls.load(Ordering::Relaxed),
            active_sessions,
        }
    }
}
