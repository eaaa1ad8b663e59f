//! The bridge between the network thread and the host tick loop.

use super::network::NetworkThread;
use super::transport::{FatalHandler, Transport, TransportSink};
use crate::config::ServerConfig;
use crate::connection::{ConnectionId, ConnectionIdAllocator, SendServiceSelector};
use crate::error::BridgeError;
use crate::messaging::{
    DispatchReport, Dispatcher, InboundQueue, LoggingSessionlessHandler, SessionlessHandler,
};
use crate::session::{SessionCreation, SessionFactory, SessionRegistry};
use crate::stats::{BridgeCounters, BridgeStats};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// State shared between the bridge, its transport sink and the network thread.
pub(crate) struct BridgeCore {
    pub(crate) config: ServerConfig,
    pub(crate) registry: Arc<SessionRegistry>,
    pub(crate) queue: Arc<InboundQueue>,
    pub(crate) creation: SessionCreation,
    pub(crate) counters: Arc<BridgeCounters>,
    pub(crate) running: Arc<AtomicBool>,
    pub(crate) fatal: FatalHandler,
}

impl BridgeCore {
    /// Closes every registered raw connection and empties the registry.
    pub(crate) fn close_all(&self, reason: &str) -> usize {
        let contexts = self.registry.drain();
        for context in &contexts {
            context.router().close(Some(reason.to_string()));
            context.disconnect_handler().fire();
        }
        contexts.len()
    }
}

/// Builder for [`SessionBridge`].
///
/// A session factory is required; everything else has a default.
#[derive(Default)]
pub struct SessionBridgeBuilder {
    config: ServerConfig,
    factory: Option<Arc<dyn SessionFactory>>,
    sessionless: Option<Arc<dyn SessionlessHandler>>,
    fatal: Option<FatalHandler>,
}

impl SessionBridgeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn session_factory(mut self, factory: impl SessionFactory + 'static) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Handler for messages with no registered session. Defaults to
    /// [`LoggingSessionlessHandler`].
    pub fn sessionless_handler(mut self, handler: impl SessionlessHandler + 'static) -> Self {
        self.sessionless = Some(Arc::new(handler));
        self
    }

    /// Handler for errors and panics on the network thread. Defaults to
    /// logging at error level.
    pub fn fatal_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&BridgeError) + Send + Sync + 'static,
    {
        self.fatal = Some(Arc::new(handler));
        self
    }

    /// Builds the bridge.
    ///
    /// Returns [`BridgeError::MissingCollaborator`] if no session factory was
    /// supplied.
    pub fn build(self) -> Result<SessionBridge, BridgeError> {
        let factory = self
            .factory
            .ok_or(BridgeError::MissingCollaborator("session factory"))?;
        let sessionless = self
            .sessionless
            .unwrap_or_else(|| Arc::new(LoggingSessionlessHandler::new()));
        let fatal = self.fatal.unwrap_or_else(|| {
            Arc::new(|e: &BridgeError| error!("💥 Network thread failure: {}", e))
        });

        let registry = Arc::new(SessionRegistry::new());
        let queue = Arc::new(InboundQueue::new());
        let counters = Arc::new(BridgeCounters::default());
        let running = Arc::new(AtomicBool::new(false));
        let creation = SessionCreation::new(
            registry.clone(),
            Arc::new(ConnectionIdAllocator::new()),
            factory,
        );
        let dispatcher = Dispatcher::new(
            registry.clone(),
            queue.clone(),
            sessionless,
            running.clone(),
            counters.clone(),
            self.config.queue_warn_threshold,
        );

        let core = Arc::new(BridgeCore {
            config: self.config,
            registry,
            queue,
            creation,
            counters,
            running,
            fatal,
        });

        Ok(SessionBridge { core, dispatcher })
    }
}

/// One running server instance: registry, allocator, inbound queue and
/// dispatch loop, owned together.
///
/// Independent bridges never share state, so several can run in one
/// process.
pub struct SessionBridge {
    core: Arc<BridgeCore>,
    dispatcher: Dispatcher,
}

impl SessionBridge {
    pub fn builder() -> SessionBridgeBuilder {
        SessionBridgeBuilder::new()
    }

    /// Drains the inbound queue and dispatches every pending message.
    ///
    /// Call once per host tick from a single thread. Fails with
    /// [`BridgeError::NotRunning`] while no network thread is active.
    pub fn poll(&self) -> Result<DispatchReport, BridgeError> {
        self.dispatcher.poll()
    }

    /// Starts `transport` on a dedicated network thread.
    ///
    /// Fails with [`BridgeError::AlreadyRunning`] if another network thread
    /// for this bridge is still active.
    pub fn start_network<T: Transport>(&self, transport: T) -> Result<NetworkThread, BridgeError> {
        info!(
            "🚀 Starting {} transport on thread '{}'",
            transport.name(),
            self.core.config.network_thread_name
        );
        NetworkThread::spawn(self.core.clone(), Box::new(transport))
    }

    /// The event surface a transport reports to.
    ///
    /// [`start_network`](Self::start_network) hands one to its transport;
    /// this is for engines driven by the caller.
    pub fn transport_sink(&self) -> TransportSink {
        TransportSink::new(self.core.clone())
    }

    pub fn selector(&self) -> SendServiceSelector {
        SendServiceSelector::new(self.core.registry.clone())
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.core.registry
    }

    pub fn config(&self) -> &ServerConfig {
        &self.core.config
    }

    /// Closes one connection from the server side.
    ///
    /// The raw connection is closed and the disconnect handler fired, which
    /// removes the session.
    pub fn close_connection(
        &self,
        connection_id: ConnectionId,
        reason: Option<String>,
    ) -> Result<(), BridgeError> {
        let context = self
            .core
            .registry
            .lookup(connection_id)
            .ok_or(BridgeError::Unavailable(connection_id))?;
        context.router().close(reason);
        context.disconnect_handler().fire();
        debug!("🔌 Closed connection {}", connection_id);
        Ok(())
    }

    /// Closes every registered connection. Returns how many were closed.
    pub fn close_all_connections(&self) -> usize {
        self.core.close_all("server closing connections")
    }

    pub fn stats(&self) -> BridgeStats {
        self.core.counters.snapshot(self.core.registry.len())
    }

    pub fn connection_count(&self) -> usize {
        self.core.registry.len()
    }

    /// Whether a network thread is currently active.
    pub fn is_running(&self) -> bool {
        self.core.running.load(Ordering::Acquire)
    }
}
