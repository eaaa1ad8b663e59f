//! The once-per-tick dispatch loop.
//!
//! The host thread calls [`Dispatcher::poll`] once per tick. Each call
//! drains the pending inbound queue in one operation and routes every
//! message, in arrival order, to either its session or the sessionless
//! handler.
//!
//! # Disconnect races
//!
//! The network thread may remove a session while a batch that contains
//! messages for it is being dispatched. This is tolerated rather than
//! prevented: delivery is one attempt at most. If the lookup happens first,
//! the message reaches the closing session; if the removal happens first,
//! the message goes to the sessionless handler. Either way it is handled
//! exactly once.

use super::{InboundMessage, InboundQueue, SessionlessHandler};
use crate::error::BridgeError;
use crate::session::SessionRegistry;
use crate::stats::BridgeCounters;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{trace, warn};

/// What a single poll did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Messages taken from the queue
    pub drained: usize,
    /// Messages handed to a registered session
    pub delivered: usize,
    /// Messages handed to the sessionless handler
    pub sessionless: usize,
}

/// Routes drained messages to sessions or the sessionless handler.
pub struct Dispatcher {
    registry: Arc<SessionRegistry>,
    queue: Arc<InboundQueue>,
    sessionless: Arc<dyn SessionlessHandler>,
    running: Arc<AtomicBool>,
    in_poll: AtomicBool,
    counters: Arc<BridgeCounters>,
    queue_warn_threshold: usize,
}

/// Clears the in-poll flag even if a handler panics.
struct PollGuard<'a>(&'a AtomicBool);

impl Drop for PollGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Dispatcher {
    pub(crate) fn new(
        registry: Arc<SessionRegistry>,
        queue: Arc<InboundQueue>,
        sessionless: Arc<dyn SessionlessHandler>,
        running: Arc<AtomicBool>,
        counters: Arc<BridgeCounters>,
        queue_warn_threshold: usize,
    ) -> Self {
        Self {
            registry,
            queue,
            sessionless,
            running,
            in_poll: AtomicBool::new(false),
            counters,
            queue_warn_threshold,
        }
    }

    /// Drains and dispatches every pending inbound message.
    ///
    /// # Errors
    ///
    /// * [`BridgeError::NotRunning`] if the network thread is not active.
    ///   The queue is left untouched.
    /// * [`BridgeError::PollInProgress`] if called from inside a handler or
    ///   concurrently with another poll.
    pub fn poll(&self) -> Result<DispatchReport, BridgeError> {
        if !self.running.load(Ordering::Acquire) {
            return Err(BridgeError::NotRunning);
        }
        if self
            .in_poll
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(BridgeError::PollInProgress);
        }
        let _guard = PollGuard(&self.in_poll);

        let report = self.dispatch_pending();
        BridgeCounters::increment(&self.counters.polls);
        Ok(report)
    }

    fn dispatch_pending(&self) -> DispatchReport {
        let batch = self.queue.drain_all();
        if batch.is_empty() {
            return DispatchReport::default();
        }

        let mut report = DispatchReport {
            drained: batch.len(),
            ..DispatchReport::default()
        };
        if report.drained > self.queue_warn_threshold {
            warn!(
                "⚠️ Drained {} inbound messages in one tick (threshold {})",
                report.drained, self.queue_warn_threshold
            );
        }

        for message in batch {
            self.route(message, &mut report);
        }

        BridgeCounters::add(&self.counters.messages_delivered, report.delivered as u64);
        BridgeCounters::add(&self.counters.messages_sessionless, report.sessionless as u64);
        trace!(
            "✅ Dispatched {} messages ({} to sessions, {} sessionless)",
            report.drained,
            report.delivered,
            report.sessionless
        );
        report
    }

    fn route(&self, message: InboundMessage, report: &mut DispatchReport) {
        // The read lock is released before any handler runs.
        match self.registry.lookup(message.connection_id) {
            Some(context) => {
                let subscribers = context.deliver(&message);
                if subscribers == 0 {
                    trace!(
                        "Session for connection {} has no subscribers; message dropped by session layer",
                        message.connection_id
                    );
                }
                report.delivered += 1;
            }
            None => {
                self.sessionless.handle_sessionless(message);
                report.sessionless += 1;
            }
        }
    }
}
