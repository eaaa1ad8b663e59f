//! Disconnection callbacks for a single connection.

use crate::connection::ConnectionId;
use parking_lot::Mutex;
use std::sync::Arc;

type DisconnectCallback = Box<dyn FnOnce(ConnectionId) + Send>;

#[derive(Default)]
struct DisconnectState {
    fired: bool,
    callbacks: Vec<DisconnectCallback>,
}

struct DisconnectInner {
    connection_id: ConnectionId,
    state: Mutex<DisconnectState>,
}

/// Fires once when the transport reports the connection closed.
///
/// The session factory receives a clone and may register its own callbacks.
/// The creation protocol registers the registry removal ahead of them, so
/// application callbacks observe the session already removed. A callback
/// registered after the handler fired runs immediately.
#[derive(Clone)]
pub struct DisconnectHandler {
    inner: Arc<DisconnectInner>,
}

impl DisconnectHandler {
    pub fn new(connection_id: ConnectionId) -> Self {
        Self {
            inner: Arc::new(DisconnectInner {
                connection_id,
                state: Mutex::new(DisconnectState::default()),
            }),
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.inner.connection_id
    }

    /// Registers a callback run when the connection closes.
    pub fn on_disconnect<F>(&self, callback: F)
    where
        F: FnOnce(ConnectionId) + Send + 'static,
    {
        self.register(Box::new(callback), false);
    }

    /// Registers a callback that runs before every other registered callback.
    pub(crate) fn on_disconnect_first<F>(&self, callback: F)
    where
        F: FnOnce(ConnectionId) + Send + 'static,
    {
        self.register(Box::new(callback), true);
    }

    fn register(&self, callback: DisconnectCallback, first: bool) {
        let mut state = self.inner.state.lock();
        if state.fired {
            drop(state);
            callback(self.inner.connection_id);
            return;
        }
        if first {
            state.callbacks.insert(0, callback);
        } else {
            state.callbacks.push(callback);
        }
    }

    /// Runs all registered callbacks. Only the first call has any effect.
    ///
    /// Returns true if this call fired the handler.
    pub fn fire(&self) -> bool {
        let callbacks = {
            let mut state = self.inner.state.lock();
            if state.fired {
                return false;
            }
            state.fired = true;
            std::mem::take(&mut state.callbacks)
        };

        for callback in callbacks {
            callback(self.inner.connection_id);
        }
        true
    }

    pub fn is_fired(&self) -> bool {
        self.inner.state.lock().fired
    }
}
