//! Inbound message handling between the network thread and the host tick.
//!
//! This module provides the pending inbound queue filled by the network
//! thread, the handler for messages that have no session, and the dispatch
//! loop that drains the queue once per host tick.

pub mod dispatcher;
pub mod queue;
pub mod sessionless;
pub mod types;

pub use dispatcher::{DispatchReport, Dispatcher};
pub use queue::InboundQueue;
pub use sessionless::{LoggingSessionlessHandler, SessionlessHandler};
pub use types::InboundMessage;
