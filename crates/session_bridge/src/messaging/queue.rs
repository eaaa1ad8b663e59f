//! The pending inbound queue.

use super::InboundMessage;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// FIFO buffer between the network thread and the dispatch loop.
///
/// The network thread pushes one message at a time; the dispatch loop takes
/// the whole buffer in a single lock section.
#[derive(Debug, Default)]
pub struct InboundQueue {
    pending: Mutex<VecDeque<InboundMessage>>,
}

impl InboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, message: InboundMessage) {
        self.pending.lock().push_back(message);
    }

    /// Takes every pending message, leaving the queue empty.
    pub fn drain_all(&self) -> VecDeque<InboundMessage> {
        std::mem::take(&mut *self.pending.lock())
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}
