//! WebSocket transport built on tokio and tokio-tungstenite.
//!
//! The transport runs a single-threaded tokio runtime on the network thread.
//! Each accepted socket gets a reader loop that reports frames to the
//! [`TransportSink`] and a writer task fed by an unbounded channel, which is
//! what the bridge's [`MessageRouter`](crate::MessageRouter) sends through.

use super::transport::{Transport, TransportSink};
use crate::connection::RawConnection;
use crate::error::BridgeError;
use crate::shutdown::ShutdownState;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{timeout, Duration};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};
use tracing::{debug, error, info, trace, warn};

type WsSender = SplitSink<WebSocketStream<TcpStream>, Message>;

/// How long open connections get to finish their close handshake.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// WebSocket network engine.
///
/// Binding happens eagerly in [`WebSocketTransport::bind`] so address
/// errors surface on the caller's thread and an ephemeral port can be read
/// back before the transport starts.
pub struct WebSocketTransport {
    listener: std::net::TcpListener,
    local_addr: SocketAddr,
}

impl WebSocketTransport {
    pub fn bind(addr: SocketAddr) -> Result<Self, BridgeError> {
        let listener = std::net::TcpListener::bind(addr)
            .map_err(|e| BridgeError::Network(format!("Failed to bind {addr}: {e}")))?;
        listener
            .set_nonblocking(true)
            .map_err(|e| BridgeError::Network(format!("Failed to set non-blocking: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| BridgeError::Network(format!("Failed to read local address: {e}")))?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    async fn serve(self, sink: TransportSink, shutdown: ShutdownState) -> Result<(), BridgeError> {
        let listener = TcpListener::from_std(self.listener)
            .map_err(|e| BridgeError::Network(format!("Tokio listener creation failed: {e}")))?;
        info!("🌐 WebSocket transport listening on {}", self.local_addr);

        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        connections.spawn(handle_connection(
                            stream,
                            addr,
                            sink.clone(),
                            shutdown.clone(),
                        ));
                    }
                    Err(e) => error!("Failed to accept connection: {}", e),
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        info!("🛑 WebSocket transport closing {} connection(s)", connections.len());
        let drained = timeout(CLOSE_GRACE, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!("⚠️ Connections did not close within {:?}, aborting them", CLOSE_GRACE);
            connections.abort_all();
        }
        Ok(())
    }
}

impl Transport for WebSocketTransport {
    fn name(&self) -> &str {
        "websocket"
    }

    fn run(self: Box<Self>, sink: TransportSink, shutdown: ShutdownState) -> Result<(), BridgeError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| BridgeError::Internal(format!("Failed to build network runtime: {e}")))?;
        runtime.block_on(self.serve(sink, shutdown))
    }
}

enum Outbound {
    Data(Vec<u8>),
    Pong(Vec<u8>),
    Close(Option<String>),
}

/// The bridge-facing side of one WebSocket.
struct WebSocketConnection {
    remote_addr: SocketAddr,
    outbound: mpsc::UnboundedSender<Outbound>,
    open: AtomicBool,
}

impl RawConnection for WebSocketConnection {
    fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    fn send(&self, payload: Vec<u8>) -> Result<(), BridgeError> {
        if !self.is_open() {
            return Err(BridgeError::Network(format!(
                "Connection to {} is closed",
                self.remote_addr
            )));
        }
        self.outbound
            .send(Outbound::Data(payload))
            .map_err(|_| BridgeError::Network(format!("Writer for {} has stopped", self.remote_addr)))
    }

    fn close(&self, reason: Option<String>) {
        if self.open.swap(false, Ordering::AcqRel) {
            let _ = self.outbound.send(Outbound::Close(reason));
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && !self.outbound.is_closed()
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    sink: TransportSink,
    shutdown: ShutdownState,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws_stream) => ws_stream,
        Err(e) => {
            debug!("WebSocket handshake with {} failed: {}", addr, e);
            return;
        }
    };

    let (ws_sender, mut ws_receiver) = ws_stream.split();
    let (outbound, outbound_rx) = mpsc::unbounded_channel();
    let mut writer = tokio::spawn(write_outbound(ws_sender, outbound_rx));
    let connection = Arc::new(WebSocketConnection {
        remote_addr: addr,
        outbound,
        open: AtomicBool::new(true),
    });

    let Some(connection_id) = sink.on_accept(connection.clone()) else {
        // The sink already closed the connection; let the close frame go out.
        finish_writer(writer).await;
        return;
    };

    let mut writer_finished = false;
    loop {
        tokio::select! {
            _ = shutdown.wait() => {
                connection.close(Some("server shutting down".to_string()));
                break;
            }
            frame = ws_receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    sink.on_message(connection_id, text.as_str().as_bytes().to_vec());
                }
                Some(Ok(Message::Binary(data))) => sink.on_message(connection_id, data.to_vec()),
                Some(Ok(Message::Ping(data))) => {
                    let _ = connection.outbound.send(Outbound::Pong(data.to_vec()));
                }
                Some(Ok(Message::Close(_))) => {
                    debug!("🔌 Client {} requested close", connection_id);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("WebSocket error for connection {}: {}", connection_id, e);
                    break;
                }
                None => break,
            },
            _ = &mut writer, if !writer_finished => {
                // Closed from the server side, or the socket stopped accepting writes.
                writer_finished = true;
                break;
            }
        }
    }

    connection.open.store(false, Ordering::Release);
    sink.on_disconnect(connection_id);
    if !writer_finished {
        let _ = connection.outbound.send(Outbound::Close(None));
        finish_writer(writer).await;
    }
    trace!("Connection {} handler finished", connection_id);
}

async fn finish_writer(writer: JoinHandle<()>) {
    if timeout(Duration::from_secs(1), writer).await.is_err() {
        debug!("Writer did not finish in time");
    }
}

async fn write_outbound(mut sender: WsSender, mut outbound: mpsc::UnboundedReceiver<Outbound>) {
    while let Some(item) = outbound.recv().await {
        let (message, last) = match item {
            Outbound::Data(payload) => (data_frame(payload), false),
            Outbound::Pong(data) => (Message::Pong(data.into()), false),
            Outbound::Close(reason) => {
                let frame = CloseFrame {
                    code: CloseCode::Normal,
                    reason: reason.unwrap_or_default().into(),
                };
                (Message::Close(Some(frame)), true)
            }
        };
        if let Err(e) = sender.send(message).await {
            debug!("Failed to send message: {}", e);
            break;
        }
        if last {
            break;
        }
    }
    let _ = sender.close().await;
}

/// Valid UTF-8 goes out as a text frame, anything else as binary.
fn data_frame(payload: Vec<u8>) -> Message {
    match String::from_utf8(payload) {
        Ok(text) => Message::Text(text.into()),
        Err(e) => Message::Binary(e.into_bytes().into()),
    }
}
