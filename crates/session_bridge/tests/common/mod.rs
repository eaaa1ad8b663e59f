#![allow(dead_code)]

use parking_lot::Mutex;
use session_bridge::{
    BridgeError, ConnectionDetails, ConnectionId, DisconnectHandler, MessageRouter,
    RawConnection, RouteBack, Session, ShutdownState, Subscriptions, Transport, TransportSink,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Default)]
pub struct MockConnection {
    sent: Mutex<Vec<Vec<u8>>>,
    close_reason: Mutex<Option<String>>,
    closed: AtomicBool,
}

impl MockConnection {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn close_reason(&self) -> Option<String> {
        self.close_reason.lock().clone()
    }
}

impl RawConnection for MockConnection {
    fn remote_addr(&self) -> SocketAddr {
        SocketAddr::from(([10, 0, 0, 1], 51000))
    }

    fn send(&self, payload: Vec<u8>) -> Result<(), BridgeError> {
        if self.is_closed() {
            return Err(BridgeError::Network("closed".to_string()));
        }
        self.sent.lock().push(payload);
        Ok(())
    }

    fn close(&self, reason: Option<String>) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            *self.close_reason.lock() = reason;
        }
    }

    fn is_open(&self) -> bool {
        !self.is_closed()
    }
}

pub struct PlainSession(pub ConnectionId);

impl Session for PlainSession {
    fn connection_id(&self) -> ConnectionId {
        self.0
    }
}

pub fn accept_all(
    _router: MessageRouter,
    details: &ConnectionDetails,
    _subscriptions: Subscriptions,
    _disconnect: DisconnectHandler,
    _route_back: RouteBack,
) -> Option<Arc<dyn Session>> {
    Some(Arc::new(PlainSession(details.connection_id)))
}

/// Transport that reports nothing and exits on shutdown.
pub struct IdleTransport;

impl Transport for IdleTransport {
    fn name(&self) -> &str {
        "idle"
    }

    fn run(self: Box<Self>, _sink: TransportSink, shutdown: ShutdownState) -> Result<(), BridgeError> {
        while !shutdown.is_shutdown_initiated() {
            std::thread::sleep(Duration::from_millis(2));
        }
        Ok(())
    }
}

pub struct FailingTransport;

impl Transport for FailingTransport {
    fn name(&self) -> &str {
        "failing"
    }

    fn run(self: Box<Self>, _sink: TransportSink, _shutdown: ShutdownState) -> Result<(), BridgeError> {
        Err(BridgeError::Network("listener went away".to_string()))
    }
}

pub struct PanickingTransport;

impl Transport for PanickingTransport {
    fn name(&self) -> &str {
        "panicking"
    }

    fn run(self: Box<Self>, _sink: TransportSink, _shutdown: ShutdownState) -> Result<(), BridgeError> {
        panic!("transport exploded");
    }
}

/// Spins until `condition` holds or two seconds pass.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}
