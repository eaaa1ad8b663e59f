mod common;

use common::PlainSession;
use futures_util::{SinkExt, StreamExt};
use session_bridge::{
    ConnectionDetails, DisconnectHandler, MessageRouter, RouteBack, ServerConfig, Session,
    SessionBridge, Subscriptions, WebSocketTransport,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn echo_bridge() -> SessionBridge {
    let config = ServerConfig {
        bind_address: SocketAddr::from(([127, 0, 0, 1], 0)),
        ..ServerConfig::default()
    };
    SessionBridge::builder()
        .config(config)
        .session_factory(
            |_router: MessageRouter,
             details: &ConnectionDetails,
             subscriptions: Subscriptions,
             _disconnect: DisconnectHandler,
             route_back: RouteBack|
             -> Option<Arc<dyn Session>> {
                subscriptions.subscribe(move |message| {
                    let _ = route_back.send(message.payload.clone());
                });
                Some(Arc::new(PlainSession(details.connection_id)))
            },
        )
        .build()
        .expect("bridge should build")
}

/// Polls the bridge like a host tick loop until the client receives a frame.
async fn next_frame(bridge: &SessionBridge, client: &mut Client) -> Option<Message> {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        let _ = bridge.poll();
        match tokio::time::timeout(Duration::from_millis(20), client.next()).await {
            Ok(Some(Ok(message))) => return Some(message),
            Ok(_) => return None,
            Err(_) => continue,
        }
    }
    None
}

async fn wait_for_sessions(bridge: &SessionBridge, expected: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while bridge.connection_count() != expected && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(bridge.connection_count(), expected);
}

#[tokio::test]
async fn echoes_text_and_binary_frames() {
    let bridge = echo_bridge();
    let transport = WebSocketTransport::bind(bridge.config().bind_address).expect("bind");
    let addr = transport.local_addr();
    let mut network = bridge.start_network(transport).expect("start");

    let (mut client, _) = connect_async(format!("ws://{addr}"))
        .await
        .expect("client should connect");
    wait_for_sessions(&bridge, 1).await;

    client
        .send(Message::Text("hello".into()))
        .await
        .expect("send text");
    let reply = next_frame(&bridge, &mut client).await.expect("text echo");
    assert_eq!(reply.to_text().expect("text frame"), "hello");

    client
        .send(Message::Binary(vec![0xff, 0x00, 0x10].into()))
        .await
        .expect("send binary");
    let reply = next_frame(&bridge, &mut client).await.expect("binary echo");
    assert!(reply.is_binary());
    assert_eq!(reply.into_data().to_vec(), vec![0xff, 0x00, 0x10]);

    network.stop();
    network.dispose();
}

#[tokio::test]
async fn client_close_removes_session() {
    let bridge = echo_bridge();
    let transport = WebSocketTransport::bind(bridge.config().bind_address).expect("bind");
    let addr = transport.local_addr();
    let mut network = bridge.start_network(transport).expect("start");

    let (mut client, _) = connect_async(format!("ws://{addr}"))
        .await
        .expect("client should connect");
    wait_for_sessions(&bridge, 1).await;

    client.close(None).await.expect("close");
    wait_for_sessions(&bridge, 0).await;

    network.stop();
}

#[tokio::test]
async fn server_close_sends_close_frame() {
    let bridge = echo_bridge();
    let transport = WebSocketTransport::bind(bridge.config().bind_address).expect("bind");
    let addr = transport.local_addr();
    let mut network = bridge.start_network(transport).expect("start");

    let (mut client, _) = connect_async(format!("ws://{addr}"))
        .await
        .expect("client should connect");
    wait_for_sessions(&bridge, 1).await;

    let id = bridge.registry().connection_ids()[0];
    bridge
        .close_connection(id, Some("kicked".to_string()))
        .expect("close");

    match next_frame(&bridge, &mut client).await {
        Some(Message::Close(Some(frame))) => assert_eq!(frame.reason.as_str(), "kicked"),
        other => panic!("expected close frame, got {other:?}"),
    }
    assert_eq!(bridge.connection_count(), 0);

    network.stop();
}

#[tokio::test]
async fn bind_failure_is_a_network_error() {
    let first = WebSocketTransport::bind(SocketAddr::from(([127, 0, 0, 1], 0))).expect("bind");
    let taken = first.local_addr();

    let second = WebSocketTransport::bind(taken);
    assert!(matches!(second, Err(session_bridge::BridgeError::Network(_))));
}
