//! End-to-end streaming tests over a real socket
//!
//! Each test binds the router on an ephemeral port, connects with a
//! WebSocket client and drives the handshake.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use carstream_api::{create_router, AppState, Handshake, StateAggregator};
use carstream_can::{
    AcquisitionEngine, BusConnector, EngineSettings, EngineState, MockBusHandle, MockConnector,
};
use carstream_core::{AcquisitionStatus, InMemoryProfileStore};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const SIM_QUANTITIES: [&str; 6] = [
    "speedKmh",
    "rpm",
    "engineTempC",
    "instantConsumption",
    "fuelLiters",
    "rangeKm",
];

// =============================================================================
// Harness
// =============================================================================

struct TestServer {
    addr: SocketAddr,
    engine: Arc<AcquisitionEngine>,
}

async fn spawn_server(connector: Arc<dyn BusConnector>) -> TestServer {
    let settings = EngineSettings {
        interface: "vcan0".to_string(),
        ..Default::default()
    };
    let (engine, readings) = AcquisitionEngine::new(settings, connector);
    let engine = Arc::new(engine);

    let aggregator = Arc::new(StateAggregator::new());
    aggregator.clone().spawn_consumer(readings);

    let store = InMemoryProfileStore::with_builtin().unwrap();
    let state = AppState::new(engine.clone(), aggregator, Arc::new(store));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });

    TestServer { addr, engine }
}

async fn spawn_simulated() -> TestServer {
    spawn_server(Arc::new(MockConnector::failing("no such device"))).await
}

async fn spawn_with_bus() -> (TestServer, MockBusHandle) {
    let (connector, handle) = MockConnector::new();
    (spawn_server(Arc::new(connector)).await, handle)
}

async fn connect(server: &TestServer) -> Client {
    let url = format!("ws://{}/ws", server.addr);
    let (ws, _) = connect_async(url).await.expect("WebSocket connect failed");
    ws
}

async fn send_handshake(ws: &mut Client, bytes: &[u8]) {
    ws.send(Message::binary(bytes.to_vec())).await.unwrap();
}

async fn next_message(ws: &mut Client) -> Message {
    timeout(Duration::from_secs(3), ws.next())
        .await
        .expect("Timed out waiting for a message")
        .expect("Stream ended")
        .expect("WebSocket error")
}

async fn next_update(ws: &mut Client) -> serde_json::Value {
    loop {
        match next_message(ws).await {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("Expected a text update, got {:?}", other),
        }
    }
}

/// Read updates until one satisfies `pred`
async fn update_where<F>(ws: &mut Client, pred: F) -> serde_json::Value
where
    F: Fn(&serde_json::Value) -> bool,
{
    for _ in 0..200 {
        let update = next_update(ws).await;
        if pred(&update) {
            return update;
        }
    }
    panic!("No matching update received");
}

async fn expect_close(ws: &mut Client, reason: &str) {
    match next_message(ws).await {
        Message::Close(Some(frame)) => {
            assert_eq!(frame.code, CloseCode::Policy);
            assert_eq!(frame.reason.as_str(), reason);
        }
        other => panic!("Expected close frame, got {:?}", other),
    }
}

// =============================================================================
// Handshake
// =============================================================================

#[tokio::test]
async fn test_short_handshake_closes_with_invalid_length() {
    let server = spawn_simulated().await;
    let mut ws = connect(&server).await;

    send_handshake(&mut ws, &Handshake::new(0x1234).encode()[..5]).await;
    expect_close(&mut ws, "Invalid Length").await;
    assert_eq!(server.engine.state(), EngineState::Idle);
}

#[tokio::test]
async fn test_wrong_command_closes_with_invalid_cmd() {
    let server = spawn_simulated().await;
    let mut ws = connect(&server).await;

    let mut msg = Handshake::new(0x1234).encode();
    msg[0] = 0x02;
    send_handshake(&mut ws, &msg).await;
    expect_close(&mut ws, "Invalid CMD").await;
}

#[tokio::test]
async fn test_bad_checksum_closes_with_invalid_crc() {
    let server = spawn_simulated().await;
    let mut ws = connect(&server).await;

    let mut msg = Handshake::new(0x1234).encode();
    msg[8] ^= 0x80;
    send_handshake(&mut ws, &msg).await;
    expect_close(&mut ws, "Invalid CRC").await;
    assert_eq!(server.engine.status(), AcquisitionStatus::not_started());
}

#[tokio::test]
async fn test_unknown_model_gets_text_reply() {
    let server = spawn_simulated().await;
    let mut ws = connect(&server).await;

    send_handshake(&mut ws, &Handshake::new(0xBEEF).encode()).await;
    match next_message(&mut ws).await {
        Message::Text(text) => assert_eq!(text.as_str(), "Unknown Model"),
        other => panic!("Expected text, got {:?}", other),
    }
    assert_eq!(server.engine.state(), EngineState::Idle);
}

// =============================================================================
// Streaming
// =============================================================================

#[tokio::test]
async fn test_simulated_stream_publishes_all_quantities() {
    let server = spawn_simulated().await;
    let mut ws = connect(&server).await;

    send_handshake(&mut ws, &Handshake::new(0x1234).encode()).await;

    let update = update_where(&mut ws, |u| {
        SIM_QUANTITIES.iter().all(|name| u.get(*name).is_some())
    })
    .await;

    assert_eq!(update["can_ok"], 0);
    assert_eq!(update["can_err"], "simulated");
    for name in SIM_QUANTITIES {
        assert!(update[name].is_number(), "{} is not a number", name);
    }
}

#[tokio::test]
async fn test_live_bus_stream() {
    let (server, bus) = spawn_with_bus().await;
    let mut ws = connect(&server).await;

    send_handshake(&mut ws, &Handshake::new(0x1234).encode()).await;
    bus.inject(0x1D0, &[134, 0, 0, 0, 0, 0, 0, 0]);
    bus.inject(0x0AA, &[0x00, 0x00, 0xFF, 0x00, 0xE0, 0x2E, 0x00, 0x00]);

    let update = update_where(&mut ws, |u| u.get("rpm").is_some()).await;
    assert_eq!(update["can_ok"], 1);
    assert!(update.get("can_err").is_none());
    assert_eq!(update["engineTempC"], 86.0);
    assert_eq!(update["rpm"], 3000.0);
}

#[tokio::test]
async fn test_updates_only_when_changed() {
    let (server, bus) = spawn_with_bus().await;
    let mut ws = connect(&server).await;

    send_handshake(&mut ws, &Handshake::new(0x1234).encode()).await;
    bus.inject(0x1D0, &[100]);
    update_where(&mut ws, |u| u.get("engineTempC").is_some()).await;

    // Nothing new on the bus: no further updates
    let quiet = timeout(Duration::from_millis(300), ws.next()).await;
    assert!(quiet.is_err(), "unexpected update: {:?}", quiet);

    bus.inject(0x1D0, &[101]);
    let update = next_update(&mut ws).await;
    assert_eq!(update["engineTempC"], 53.0);
}

#[tokio::test]
async fn test_new_session_starts_from_empty_snapshot() {
    let (server, bus) = spawn_with_bus().await;
    let mut first = connect(&server).await;

    send_handshake(&mut first, &Handshake::new(0x1234).encode()).await;
    bus.inject(0x349, &[0x80, 0x0C, 0x40, 0x06, 0, 0, 0, 0]);
    update_where(&mut first, |u| u.get("fuelLeftLiters").is_some()).await;

    // The first client stays connected while a second session takes over
    let mut second = connect(&server).await;
    send_handshake(&mut second, &Handshake::new(0x1234).encode()).await;

    // The mock bus only opens once, so the new run is simulated
    for _ in 0..200 {
        let update = next_update(&mut second).await;
        assert!(
            update.get("fuelLeftLiters").is_none(),
            "stale value from the previous run: {}",
            update
        );
        if SIM_QUANTITIES.iter().all(|name| update.get(*name).is_some()) {
            assert_eq!(update["can_err"], "simulated");
            assert!(bus.is_closed());
            return;
        }
    }
    panic!("Second session never saw a full simulated update");
}

#[tokio::test]
async fn test_client_disconnect_stops_acquisition() {
    let server = spawn_simulated().await;
    let mut ws = connect(&server).await;

    send_handshake(&mut ws, &Handshake::new(0x1234).encode()).await;
    update_where(&mut ws, |u| u.get("rpm").is_some()).await;
    assert_eq!(server.engine.state(), EngineState::Running);

    ws.close(None).await.unwrap();
    drop(ws);

    for _ in 0..100 {
        if server.engine.state() == EngineState::Idle {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(server.engine.state(), EngineState::Idle);
    assert_eq!(server.engine.status(), AcquisitionStatus::stopped());
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let server = spawn_simulated().await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let mut response = String::new();
    timeout(Duration::from_secs(3), stream.read_to_string(&mut response))
        .await
        .unwrap()
        .unwrap();

    assert!(response.starts_with("HTTP/1.1 200"), "{}", response);
    assert!(response.contains(r#""status":"ok""#));
    assert!(response.contains(r#""engine":"idle""#));
    assert!(response.contains("not started"));
}
