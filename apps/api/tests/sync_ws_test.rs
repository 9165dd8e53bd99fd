//! End-to-end tests for the playback sync WebSocket

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use common::{spawn_server, TestApp};
use encore_api::config::{Config, SyncConfig};
use encore_shared_config::LibraryConfig;
use encore_test_utils::MusicLibraryFixture;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

async fn start_app() -> (TestApp, SocketAddr) {
    start_app_with(|_| {}).await
}

async fn start_app_with(tweak: impl FnOnce(&mut SyncConfig)) -> (TestApp, SocketAddr) {
    let library = MusicLibraryFixture::new();
    let mut config = Config::for_library(LibraryConfig::with_root(library.root()));
    config.sync.time_update_interval = Duration::from_millis(50);
    tweak(&mut config.sync);

    let app = TestApp::with_config(library, config);
    let addr = spawn_server(app.router()).await;
    (app, addr)
}

async fn wait_for_sessions(app: &TestApp, expected: usize) -> bool {
    tokio::time::timeout(RECV_TIMEOUT, async {
        while app.services.hub.session_count().await != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .is_ok()
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}/ws/sync"))
        .await
        .expect("failed to connect");
    client
}

/// Next JSON text frame, skipping keepalives
async fn next_json(client: &mut Client) -> Value {
    tokio::time::timeout(RECV_TIMEOUT, async {
        loop {
            match client.next().await {
                Some(Ok(Message::Text(text))) => return serde_json::from_str(&text).unwrap(),
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                other => panic!("unexpected frame: {other:?}"),
            }
        }
    })
    .await
    .expect("timed out waiting for a message")
}

async fn assert_silent(client: &mut Client, wait: Duration) {
    let result = tokio::time::timeout(wait, async {
        loop {
            match client.next().await {
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                other => return other,
            }
        }
    })
    .await;
    assert!(result.is_err(), "expected no message, got {result:?}");
}

async fn send(client: &mut Client, msg: Value) {
    client.send(Message::Text(msg.to_string())).await.unwrap();
}

#[tokio::test]
async fn test_snapshot_on_connect() {
    let (_app, addr) = start_app().await;
    let mut client = connect(addr).await;

    let snapshot = next_json(&mut client).await;
    assert_eq!(
        snapshot,
        json!({"type": "stateChanged", "state": "paused", "timestamp": 0.0})
    );
}

#[tokio::test]
async fn test_seek_is_broadcast_to_every_session() {
    let (_app, addr) = start_app().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    next_json(&mut a).await;
    next_json(&mut b).await;

    send(&mut a, json!({"type": "seek", "timestamp": 30.0})).await;

    let expected = json!({"type": "stateChanged", "state": "paused", "timestamp": 30.0});
    assert_eq!(next_json(&mut a).await, expected);
    assert_eq!(next_json(&mut b).await, expected);

    // A late joiner sees the current clock
    let mut c = connect(addr).await;
    assert_eq!(next_json(&mut c).await, expected);
}

#[tokio::test]
async fn test_negative_seek_clamps_to_zero() {
    let (_app, addr) = start_app().await;
    let mut client = connect(addr).await;
    next_json(&mut client).await;

    send(&mut client, json!({"type": "seek", "timestamp": -5.0})).await;

    let msg = next_json(&mut client).await;
    assert_eq!(msg["timestamp"], 0.0);
}

#[tokio::test]
async fn test_get_time_answers_sender_only() {
    let (_app, addr) = start_app().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    next_json(&mut a).await;
    next_json(&mut b).await;

    send(&mut a, json!({"type": "seek", "timestamp": 12.5})).await;
    next_json(&mut a).await;
    next_json(&mut b).await;

    send(&mut a, json!({"type": "getTime"})).await;

    assert_eq!(
        next_json(&mut a).await,
        json!({"type": "timeUpdate", "timestamp": 12.5})
    );
    assert_silent(&mut b, Duration::from_millis(200)).await;
}

#[tokio::test]
async fn test_malformed_message_keeps_session_usable() {
    let (_app, addr) = start_app().await;
    let mut client = connect(addr).await;
    next_json(&mut client).await;

    client.send(Message::Text("not json".to_string())).await.unwrap();
    let error = next_json(&mut client).await;
    assert_eq!(error["type"], "error");
    assert!(error["message"]
        .as_str()
        .unwrap()
        .starts_with("Invalid message format"));

    send(&mut client, json!({"type": "rewind"})).await;
    assert_eq!(next_json(&mut client).await["type"], "error");

    send(&mut client, json!({"type": "seek", "timestamp": 3.0})).await;
    assert_eq!(next_json(&mut client).await["timestamp"], 3.0);
}

#[tokio::test]
async fn test_play_broadcasts_then_ticks() {
    let (_app, addr) = start_app().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    next_json(&mut a).await;
    next_json(&mut b).await;

    send(&mut a, json!({"type": "play"})).await;

    for client in [&mut a, &mut b] {
        let msg = next_json(client).await;
        assert_eq!(msg["type"], "stateChanged");
        assert_eq!(msg["state"], "playing");
    }

    let mut last = 0.0;
    for _ in 0..3 {
        let update = next_json(&mut b).await;
        assert_eq!(update["type"], "timeUpdate");
        let timestamp = update["timestamp"].as_f64().unwrap();
        assert!(timestamp >= last);
        last = timestamp;
    }

    send(&mut a, json!({"type": "pause"})).await;
    let paused = loop {
        let msg = next_json(&mut a).await;
        if msg["type"] == "stateChanged" {
            break msg;
        }
    };
    assert_eq!(paused["state"], "paused");
    assert!(paused["timestamp"].as_f64().unwrap() >= last);
}

#[tokio::test]
async fn test_binary_frames_are_accepted() {
    let (_app, addr) = start_app().await;
    let mut client = connect(addr).await;
    next_json(&mut client).await;

    client
        .send(Message::Binary(br#"{"type":"seek","timestamp":5}"#.to_vec()))
        .await
        .unwrap();

    assert_eq!(
        next_json(&mut client).await,
        json!({"type": "stateChanged", "state": "paused", "timestamp": 5.0})
    );
}

#[tokio::test]
async fn test_close_unregisters_session() {
    let (app, addr) = start_app().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    next_json(&mut a).await;
    next_json(&mut b).await;
    assert_eq!(app.services.hub.session_count().await, 2);

    a.close(None).await.unwrap();
    assert!(wait_for_sessions(&app, 1).await, "closed session still registered");

    // The survivor still receives broadcasts
    send(&mut b, json!({"type": "seek", "timestamp": 1.0})).await;
    assert_eq!(next_json(&mut b).await["timestamp"], 1.0);
}

#[tokio::test]
async fn test_idle_session_is_closed_and_unregistered() {
    let (app, addr) = start_app_with(|sync| {
        sync.idle_timeout = Some(Duration::from_millis(200));
        sync.ping_interval = None;
    })
    .await;

    let mut client = connect(addr).await;
    next_json(&mut client).await;
    assert_eq!(app.services.hub.session_count().await, 1);

    // Send nothing; the server should hang up on its own
    let closed = tokio::time::timeout(RECV_TIMEOUT, async {
        loop {
            match client.next().await {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "idle socket was never closed");
    assert!(wait_for_sessions(&app, 0).await, "idle session still registered");
}

#[tokio::test]
async fn test_active_session_outlives_idle_timeout() {
    let (app, addr) = start_app_with(|sync| {
        sync.idle_timeout = Some(Duration::from_millis(300));
        sync.ping_interval = None;
    })
    .await;

    let mut client = connect(addr).await;
    next_json(&mut client).await;

    for i in 0..5 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        send(&mut client, json!({"type": "seek", "timestamp": f64::from(i)})).await;
        assert_eq!(next_json(&mut client).await["timestamp"], f64::from(i));
    }
    assert_eq!(app.services.hub.session_count().await, 1);
}
