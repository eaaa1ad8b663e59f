//! Shutdown coordination between the host and the network thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Shared shutdown flag for stopping a running transport.
///
/// The flag can be checked synchronously from any thread, and async
/// transports can await it with [`ShutdownState::wait`]. Cloning shares the
/// same underlying state.
#[derive(Debug, Clone)]
pub struct ShutdownState {
    /// Flag indicating shutdown has been initiated
    shutdown_initiated: Arc<AtomicBool>,
    /// Wakes async waiters once the flag flips
    signal: Arc<watch::Sender<bool>>,
}

impl ShutdownState {
    /// Creates a new shutdown state with the flag unset.
    pub fn new() -> Self {
        let (signal, _) = watch::channel(false);
        Self {
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
            signal: Arc::new(signal),
        }
    }

    /// Returns true if shutdown has been initiated.
    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::Acquire)
    }

    /// Initiates shutdown. Calling this more than once is harmless.
    pub fn initiate_shutdown(&self) {
        if !self.shutdown_initiated.swap(true, Ordering::AcqRel) {
            info!("🛑 Shutdown initiated - network thread will stop accepting events");
        }
        self.signal.send_replace(true);
    }

    /// Resolves once shutdown has been initiated.
    pub async fn wait(&self) {
        let mut receiver = self.signal.subscribe();
        // The sender lives as long as `self`, so this cannot fail while awaited.
        let _ = receiver.wait_for(|initiated| *initiated).await;
    }
}

impl Default for ShutdownState {
    fn default() -> Self {
        Self::new()
    }
}
