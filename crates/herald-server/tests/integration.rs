//! End-to-end integration tests using a real WebSocket client.

#![allow(missing_docs)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use herald_server::{HeraldServer, ServerConfig};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::{Value, json};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Boot a test server on an ephemeral port.
async fn boot_server() -> (SocketAddr, Arc<HeraldServer>) {
    let metrics_handle = PrometheusBuilder::new().build_recorder().handle();
    let server = Arc::new(HeraldServer::new(ServerConfig::default(), metrics_handle));
    let (addr, _handle) = server.listen().await.unwrap();
    (addr, server)
}

async fn connect(addr: SocketAddr, user: &str) -> WsStream {
    let mut request = format!("ws://{addr}/ws").into_client_request().unwrap();
    let _ = request
        .headers_mut()
        .insert("x-herald-user", HeaderValue::from_str(user).unwrap());
    let (ws, _) = timeout(TIMEOUT, connect_async(request))
        .await
        .expect("connect timed out")
        .unwrap();
    ws
}

/// Next text frame as JSON, skipping control frames.
async fn next_json(ws: &mut WsStream) -> Value {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .unwrap();
        match msg {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Ping(_) | Message::Pong(_) => {}
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

/// Connect and consume the `connection.established` greeting, which also
/// guarantees the connection is registered.
async fn connect_ready(addr: SocketAddr, user: &str) -> WsStream {
    let mut ws = connect(addr, user).await;
    let greeting = next_json(&mut ws).await;
    assert_eq!(greeting["type"], "connection.established");
    assert_eq!(greeting["data"]["userId"], user);
    ws
}

/// Wait until the server closes the socket.
async fn expect_closed(ws: &mut WsStream) {
    loop {
        match timeout(TIMEOUT, ws.next()).await.expect("socket not closed") {
            None | Some(Ok(Message::Close(_)) | Err(_)) => return,
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            Some(Ok(other)) => panic!("unexpected frame before close: {other:?}"),
        }
    }
}

async fn deliver(addr: SocketAddr, user: &str, kind: &str, data: Value) -> Value {
    reqwest::Client::new()
        .post(format!("http://{addr}/deliver"))
        .json(&json!({ "userId": user, "type": kind, "data": data }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn health(addr: SocketAddr) -> Value {
    reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn wait_for_connections(addr: SocketAddr, expected: u64) {
    timeout(TIMEOUT, async {
        while health(addr).await["connections"] != expected {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("connection count never settled");
}

#[tokio::test]
async fn delivered_message_reaches_client() {
    let (addr, _server) = boot_server().await;
    let mut ws = connect_ready(addr, "alice").await;

    let resp = deliver(addr, "alice", "chat.message", json!({"text": "hello"})).await;
    assert_eq!(resp, json!({"outcome": "delivered"}));

    let frame = next_json(&mut ws).await;
    assert_eq!(frame["type"], "chat.message");
    assert_eq!(frame["receiverId"], "alice");
    assert_eq!(frame["data"]["text"], "hello");
    assert!(frame["timestamp"].is_string());
}

#[tokio::test]
async fn messages_arrive_in_order() {
    let (addr, _server) = boot_server().await;
    let mut ws = connect_ready(addr, "alice").await;

    for i in 0..5 {
        let resp = deliver(addr, "alice", "notification", json!({"seq": i})).await;
        assert_eq!(resp["outcome"], "delivered");
    }
    for i in 0..5 {
        assert_eq!(next_json(&mut ws).await["data"]["seq"], i);
    }
}

#[tokio::test]
async fn offline_user_reports_offline() {
    let (addr, _server) = boot_server().await;
    let resp = deliver(addr, "nobody", "notification", json!({})).await;
    assert_eq!(resp, json!({"outcome": "offline"}));
}

#[tokio::test]
async fn missing_identity_is_rejected() {
    let (addr, _server) = boot_server().await;
    let result = connect_async(format!("ws://{addr}/ws")).await;
    match result {
        Err(WsError::Http(resp)) => assert_eq!(resp.status().as_u16(), 401),
        Err(other) => panic!("expected 401, got {other}"),
        Ok(_) => panic!("upgrade without identity succeeded"),
    }
}

#[tokio::test]
async fn query_parameter_identity() {
    let (addr, _server) = boot_server().await;
    let (mut ws, _) = connect_async(format!("ws://{addr}/ws?user=bob"))
        .await
        .unwrap();
    let greeting = next_json(&mut ws).await;
    assert_eq!(greeting["data"]["userId"], "bob");
}

#[tokio::test]
async fn reconnect_supersedes_previous_connection() {
    let (addr, _server) = boot_server().await;
    let mut first = connect_ready(addr, "alice").await;
    let resp = deliver(addr, "alice", "chat.message", json!({"n": 1})).await;
    assert_eq!(resp["outcome"], "delivered");
    assert_eq!(next_json(&mut first).await["data"]["n"], 1);

    let mut second = connect_ready(addr, "alice").await;
    expect_closed(&mut first).await;

    let resp = deliver(addr, "alice", "chat.message", json!({"n": 2})).await;
    assert_eq!(resp["outcome"], "delivered");
    assert_eq!(next_json(&mut second).await["data"]["n"], 2);
    assert_eq!(health(addr).await["connections"], 1);
}

#[tokio::test]
async fn client_close_makes_user_offline() {
    let (addr, _server) = boot_server().await;
    let mut ws = connect_ready(addr, "alice").await;
    ws.close(None).await.unwrap();

    wait_for_connections(addr, 0).await;
    let resp = deliver(addr, "alice", "notification", json!({})).await;
    assert_eq!(resp["outcome"], "offline");
}

#[tokio::test]
async fn users_do_not_interfere() {
    let (addr, _server) = boot_server().await;
    let mut alice = connect_ready(addr, "alice").await;
    let mut bob = connect_ready(addr, "bob").await;
    wait_for_connections(addr, 2).await;

    let _ = deliver(addr, "bob", "notification", json!({"for": "bob"})).await;
    let _ = deliver(addr, "alice", "notification", json!({"for": "alice"})).await;
    assert_eq!(next_json(&mut bob).await["data"]["for"], "bob");
    assert_eq!(next_json(&mut alice).await["data"]["for"], "alice");
}

#[tokio::test]
async fn graceful_shutdown_flushes_and_closes() {
    let (addr, server) = boot_server().await;
    let mut ws = connect_ready(addr, "alice").await;
    let resp = deliver(addr, "alice", "chat.message", json!({"last": true})).await;
    assert_eq!(resp["outcome"], "delivered");

    let stopping = Arc::clone(&server);
    let shutdown = tokio::spawn(async move { stopping.shutdown_gracefully().await });

    assert_eq!(next_json(&mut ws).await["data"]["last"], true);
    expect_closed(&mut ws).await;
    assert!(timeout(TIMEOUT, shutdown).await.unwrap().unwrap());
    assert_eq!(server.hub().connection_count(), 0);
}

#[tokio::test]
async fn metrics_endpoint_is_served() {
    let (addr, _server) = boot_server().await;
    let resp = reqwest::get(format!("http://{addr}/metrics")).await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}
