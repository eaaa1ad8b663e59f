//! Error types and handling for the session bridge.
//!
//! This module defines the error types that can occur while registering
//! sessions, dispatching inbound messages and running the network thread.
//! Per-connection and per-message failures are reported through these
//! variants and handled locally; none of them is allowed to stop the
//! dispatch loop or the network thread.

use crate::connection::ConnectionId;

/// Enumeration of possible bridge errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// A dispatch-requiring call was made while the network thread is not active.
    ///
    /// Callers should not retry until the network thread has been restarted.
    #[error("Network thread is not running")]
    NotRunning,

    /// A network thread was started while another one is still active.
    #[error("Network thread is already running")]
    AlreadyRunning,

    /// `poll` was re-entered from a handler or called from two threads at once.
    #[error("Poll is already in progress")]
    PollInProgress,

    /// An id was added to the registry while already registered.
    #[error("Connection {0} is already registered")]
    DuplicateConnection(ConnectionId),

    /// A produced connection id was zero.
    #[error("Connection id allocator produced a zero connection id")]
    AllocatorInvariantViolation,

    /// A required dependency was not supplied at construction time.
    #[error("Missing required collaborator: {0}")]
    MissingCollaborator(&'static str),

    /// The connection has no registered session (never accepted, or already closed).
    #[error("Connection {0} is unavailable")]
    Unavailable(ConnectionId),

    /// The configured connection limit was reached.
    #[error("Connection limit of {0} reached")]
    ConnectionLimit(usize),

    /// Network-related errors such as binding failures or broken sockets
    #[error("Network error: {0}")]
    Network(String),

    /// Internal errors such as a panicking transport
    #[error("Internal error: {0}")]
    Internal(String),
}
