//! The dedicated OS thread that runs a transport.

use super::bridge::BridgeCore;
use super::transport::{Transport, TransportSink};
use crate::error::BridgeError;
use crate::shutdown::ShutdownState;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

/// Handle to a running network thread.
///
/// Teardown is `stop()` followed by `dispose()`. Dropping a handle that was
/// never stopped stops it; registered connections are only closed by
/// `dispose()`.
pub struct NetworkThread {
    core: Arc<BridgeCore>,
    shutdown: ShutdownState,
    handle: Option<JoinHandle<()>>,
    // Set by this thread once it has released the running flag. A later
    // network thread may own the flag after that point.
    released: Arc<AtomicBool>,
}

impl NetworkThread {
    pub(crate) fn spawn(
        core: Arc<BridgeCore>,
        transport: Box<dyn Transport>,
    ) -> Result<Self, BridgeError> {
        if core
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(BridgeError::AlreadyRunning);
        }

        let shutdown = ShutdownState::new();
        let sink = TransportSink::new(core.clone());
        let thread_core = core.clone();
        let thread_shutdown = shutdown.clone();
        let released = Arc::new(AtomicBool::new(false));
        let thread_released = released.clone();

        let spawned = thread::Builder::new()
            .name(core.config.network_thread_name.clone())
            .spawn(move || {
                run_transport(thread_core, transport, sink, thread_shutdown, thread_released)
            });

        match spawned {
            Ok(handle) => Ok(Self {
                core,
                shutdown,
                handle: Some(handle),
                released,
            }),
            Err(e) => {
                core.running.store(false, Ordering::Release);
                Err(BridgeError::Internal(format!(
                    "Failed to spawn network thread: {e}"
                )))
            }
        }
    }

    /// Whether the transport is still running.
    pub fn is_running(&self) -> bool {
        self.handle.is_some() && !self.released.load(Ordering::Acquire)
    }

    /// Signals the transport to stop and waits for the thread to exit.
    ///
    /// Once this returns, `poll` fails with `NotRunning`. Calling it again
    /// does nothing.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        info!("🛑 Stopping network thread");
        self.shutdown.initiate_shutdown();
        if handle.join().is_err() {
            (self.core.fatal)(&BridgeError::Internal(
                "network thread terminated abnormally".to_string(),
            ));
        }
        // The flag is only still ours if the thread died before releasing it.
        if !self.released.swap(true, Ordering::AcqRel) {
            self.core.running.store(false, Ordering::Release);
        }
        info!("✅ Network thread stopped");
    }

    /// Stops the thread if needed, then closes every connection still in
    /// the registry and releases it.
    ///
    /// Returns the number of connections closed.
    pub fn dispose(mut self) -> usize {
        self.stop();
        let closed = self.core.close_all("server shutting down");
        info!("🧹 Disposed network thread, closed {} remaining connection(s)", closed);
        closed
    }
}

impl Drop for NetworkThread {
    fn drop(&mut self) {
        if self.handle.is_some() {
            debug!("Network thread handle dropped without stop()");
            self.stop();
        }
    }
}

fn run_transport(
    core: Arc<BridgeCore>,
    transport: Box<dyn Transport>,
    sink: TransportSink,
    shutdown: ShutdownState,
    released: Arc<AtomicBool>,
) {
    let name = transport.name().to_string();
    let outcome = panic::catch_unwind(AssertUnwindSafe(move || transport.run(sink, shutdown)));

    // Cleared before reporting so the host sees NotRunning from here on.
    core.running.store(false, Ordering::Release);
    released.store(true, Ordering::Release);

    match outcome {
        Ok(Ok(())) => info!("🔌 {} transport exited", name),
        Ok(Err(e)) => (core.fatal)(&e),
        Err(payload) => (core.fatal)(&BridgeError::Internal(format!(
            "{} transport panicked: {}",
            name,
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
