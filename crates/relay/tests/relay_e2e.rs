//! End-to-end tests using a real WebSocket client.

use std::sync::Arc;
use std::time::Duration;

use decoder::{Decoder, OutletValue, PayloadConvention};
use futures::SinkExt;
use relay::{serve, AppState, ChannelOutlet, Dispatcher, TrackingVariant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

struct TestRelay {
    addr: std::net::SocketAddr,
    outlet_rx: mpsc::Receiver<Vec<OutletValue>>,
    _shutdown: oneshot::Sender<()>,
}

/// Boot a relay on an ephemeral port with a channel outlet.
async fn boot_relay(variant: TrackingVariant) -> TestRelay {
    let (outlet, outlet_rx) = ChannelOutlet::channel(256);
    let dispatcher = Dispatcher::new(Decoder::new(variant.convention()), Arc::new(outlet));
    let state = Arc::new(AppState::new(variant, dispatcher));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(serve(listener, state, async {
        let _ = shutdown_rx.await;
    }));

    TestRelay {
        addr,
        outlet_rx,
        _shutdown: shutdown_tx,
    }
}

async fn connect(relay: &TestRelay) -> WsStream {
    let (ws, _) = timeout(TIMEOUT, connect_async(format!("ws://{}/", relay.addr)))
        .await
        .unwrap()
        .unwrap();
    ws
}

async fn next_call(relay: &mut TestRelay) -> Vec<OutletValue> {
    timeout(TIMEOUT, relay.outlet_rx.recv())
        .await
        .expect("timed out waiting for outlet call")
        .expect("outlet channel closed")
}

fn hand_block(label: &str, fill: i64) -> String {
    let values: Vec<String> = (0..63).map(|_| fill.to_string()).collect();
    format!("\"{}\",{}", label, values.join(","))
}

#[tokio::test]
async fn test_hand_frame_reaches_outlet() {
    let mut relay = boot_relay(TrackingVariant::Hands).await;
    let mut ws = connect(&relay).await;

    ws.send(Message::text(format!("[{}]", hand_block("Left", 0))))
        .await
        .unwrap();

    let call = next_call(&mut relay).await;
    assert_eq!(call[0], OutletValue::from("/hand/0/left"));
    assert_eq!(call.len(), 64);
    assert!(call[1..].iter().all(|v| *v == OutletValue::Int(0)));
}

#[tokio::test]
async fn test_two_hands_then_index_resets() {
    let mut relay = boot_relay(TrackingVariant::Hands).await;
    let mut ws = connect(&relay).await;

    ws.send(Message::text(format!(
        "[{},{}]",
        hand_block("Left", 1),
        hand_block("Right", 2)
    )))
    .await
    .unwrap();
    ws.send(Message::text(format!("[{}]", hand_block("Right", 3))))
        .await
        .unwrap();

    assert_eq!(next_call(&mut relay).await[0], OutletValue::from("/hand/0/left"));
    assert_eq!(next_call(&mut relay).await[0], OutletValue::from("/hand/1/right"));

    let third = next_call(&mut relay).await;
    assert_eq!(third[0], OutletValue::from("/hand/0/right"));
    assert_eq!(third[1], OutletValue::Int(3));
}

#[tokio::test]
async fn test_addressed_object_frame_reaches_outlet() {
    let mut relay = boot_relay(TrackingVariant::PoseJweb).await;
    let mut ws = connect(&relay).await;

    ws.send(Message::text(r#"{"address":"/pose","args":[1,2,3]}"#))
        .await
        .unwrap();

    assert_eq!(
        next_call(&mut relay).await,
        vec![
            OutletValue::from("/pose"),
            OutletValue::Int(1),
            OutletValue::Int(2),
            OutletValue::Int(3),
        ]
    );
}

#[tokio::test]
async fn test_bad_frames_do_not_close_connection() {
    let mut relay = boot_relay(TrackingVariant::Holistic).await;
    let mut ws = connect(&relay).await;

    ws.send(Message::text("not json")).await.unwrap();
    ws.send(Message::text(r#"{"address":"/x"}"#)).await.unwrap();
    ws.send(Message::binary(vec![1u8, 2, 3])).await.unwrap();
    ws.send(Message::text(r#"["/face", 0.5, 1]"#)).await.unwrap();

    assert_eq!(
        next_call(&mut relay).await,
        vec![
            OutletValue::from("/face"),
            OutletValue::Float(0.5),
            OutletValue::Int(1),
        ]
    );
    assert!(relay.outlet_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_connections_are_independent() {
    let mut relay = boot_relay(TrackingVariant::Pose).await;
    let mut first = connect(&relay).await;
    let mut second = connect(&relay).await;

    first.send(Message::text("[1, 2]")).await.unwrap();
    assert_eq!(
        next_call(&mut relay).await,
        vec![
            OutletValue::from("/pose"),
            OutletValue::Int(1),
            OutletValue::Int(2),
        ]
    );

    first.close(None).await.unwrap();
    second.send(Message::text("[3]")).await.unwrap();
    assert_eq!(
        next_call(&mut relay).await,
        vec![OutletValue::from("/pose"), OutletValue::Int(3)]
    );
}

#[tokio::test]
async fn test_health_endpoint() {
    let mut relay = boot_relay(TrackingVariant::Iris).await;
    let mut ws = connect(&relay).await;
    ws.send(Message::text(r#"{"address":"/iris","args":[]}"#))
        .await
        .unwrap();
    next_call(&mut relay).await;

    let mut stream = TcpStream::connect(relay.addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    timeout(TIMEOUT, stream.read_to_string(&mut response))
        .await
        .unwrap()
        .unwrap();

    let body = response.split("\r\n\r\n").nth(1).unwrap();
    let health: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["variant"], "iris");
    assert_eq!(health["convention"], "addressed_object");
    assert_eq!(health["connections"], 1);
    assert_eq!(health["messages"], 1);
}
