// ABOUTME: End-to-end tests running the full bridge server against a mock agent API
// ABOUTME: Connects real WebSocket clients and checks prompt replies, liveness, health, and assets
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use agent_bridge::config::ServerConfig;
use agent_bridge::server::BridgeServer;
use common::{MockAgentApi, StreamMode};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestBridge {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestBridge {
    async fn start(mock: &MockAgentApi, ping_interval: Duration) -> Self {
        let public_dir = tempfile::tempdir().unwrap();
        std::fs::write(
            public_dir.path().join("index.html"),
            "<html><body>Agent chat</body></html>",
        )
        .unwrap();
        std::fs::create_dir(public_dir.path().join("samples")).unwrap();
        std::fs::write(
            public_dir.path().join("samples/invoice.pdf"),
            b"%PDF-1.4 sample invoice",
        )
        .unwrap();

        let config = ServerConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            http_port: 0,
            public_dir: public_dir.path().to_path_buf(),
            ping_interval,
            agent: mock.config(),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown, signal) = oneshot::channel::<()>();
        tokio::spawn(async move {
            // Keep the asset directory alive for as long as the server runs
            let _public_dir = public_dir;
            BridgeServer::new(config)
                .serve(listener, async move {
                    let _ = signal.await;
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown: Some(shutdown),
        }
    }

    async fn connect(&self) -> Client {
        let (socket, _) = connect_async(format!("ws://{}/websockets", self.addr))
            .await
            .unwrap();
        socket
    }
}

impl Drop for TestBridge {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

async fn send_json(socket: &mut Client, frame: Value) {
    socket.send(Message::Text(frame.to_string())).await.unwrap();
}

/// Next JSON text frame, skipping liveness pings
async fn next_json(socket: &mut Client) -> Value {
    loop {
        let message = timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = message {
            let frame: Value = serde_json::from_str(&text).unwrap();
            if frame["type"] != "ping" {
                return frame;
            }
        }
    }
}

#[tokio::test]
async fn test_sync_prompt_round_trip() {
    let mock = MockAgentApi::start().await;
    let bridge = TestBridge::start(&mock, Duration::from_secs(60)).await;
    let mut socket = bridge.connect().await;

    send_json(
        &mut socket,
        json!({"type": "sync-prompt", "prompt": "List courses"}),
    )
    .await;

    assert_eq!(
        next_json(&mut socket).await,
        json!({"type": "prompt-response", "data": "Here are 3 courses..."})
    );
    assert_eq!(mock.sessions_created(), 1);
}

#[tokio::test]
async fn test_async_prompt_streams_to_socket() {
    let mock = MockAgentApi::start().await;
    mock.set_stream(
        &[
            ("ProgressIndicator", json!({"message": "Working"})),
            ("Inform", json!({"message": "Done"})),
        ],
        StreamMode::Complete,
    );
    let bridge = TestBridge::start(&mock, Duration::from_secs(60)).await;
    let mut socket = bridge.connect().await;

    send_json(
        &mut socket,
        json!({"type": "async-prompt", "prompt": "Summarize"}),
    )
    .await;

    assert_eq!(
        next_json(&mut socket).await,
        json!({"type": "prompt-response", "data": {"message": "Working"}})
    );
    assert_eq!(
        next_json(&mut socket).await,
        json!({"type": "prompt-response", "data": {"message": "Done"}})
    );
    assert_eq!(
        next_json(&mut socket).await,
        json!({"type": "prompt-complete"})
    );
}

#[tokio::test]
async fn test_malformed_frame_keeps_socket_open() {
    let mock = MockAgentApi::start().await;
    let bridge = TestBridge::start(&mock, Duration::from_secs(60)).await;
    let mut socket = bridge.connect().await;

    socket
        .send(Message::Text("{not json".to_owned()))
        .await
        .unwrap();
    send_json(&mut socket, json!({"type": "sync-prompt", "prompt": "Hi"})).await;

    assert_eq!(next_json(&mut socket).await["type"], "prompt-response");
}

#[tokio::test]
async fn test_silent_client_is_disconnected() {
    let mock = MockAgentApi::start().await;
    let bridge = TestBridge::start(&mock, Duration::from_millis(100)).await;
    let mut socket = bridge.connect().await;

    let ended = timeout(Duration::from_secs(5), async {
        while let Some(message) = socket.next().await {
            match message {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    })
    .await;

    assert!(ended.is_ok(), "silent client was never disconnected");
}

#[tokio::test]
async fn test_answering_client_stays_connected() {
    let mock = MockAgentApi::start().await;
    let bridge = TestBridge::start(&mock, Duration::from_millis(100)).await;
    let mut socket = bridge.connect().await;

    let mut pings = 0;
    while pings < 4 {
        let message = timeout(Duration::from_secs(5), socket.next())
            .await
            .unwrap()
            .expect("socket closed")
            .unwrap();
        match message {
            Message::Text(text) if text.contains("\"ping\"") => {
                pings += 1;
                send_json(&mut socket, json!({"type": "pong"})).await;
            }
            Message::Close(_) => panic!("answering client was disconnected"),
            _ => {}
        }
    }

    send_json(&mut socket, json!({"type": "sync-prompt", "prompt": "Still there?"})).await;
    assert_eq!(next_json(&mut socket).await["type"], "prompt-response");
}

#[tokio::test]
async fn test_health_and_static_assets() {
    let mock = MockAgentApi::start().await;
    let bridge = TestBridge::start(&mock, Duration::from_secs(60)).await;
    let _socket = bridge.connect().await;
    let http = reqwest::Client::new();

    // Registration completes just after the handshake
    let mut health = Value::Null;
    for _ in 0..50 {
        health = http
            .get(format!("http://{}/health", bridge.addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if health["connections"] == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["connections"], 1);

    let page = http
        .get(format!("http://{}/", bridge.addr))
        .send()
        .await
        .unwrap();
    assert!(page.status().is_success());
    assert!(page.text().await.unwrap().contains("Agent chat"));

    let missing = http
        .get(format!("http://{}/missing.js", bridge.addr))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_order_invoice_served_for_any_order() {
    let mock = MockAgentApi::start().await;
    let bridge = TestBridge::start(&mock, Duration::from_secs(60)).await;
    let http = reqwest::Client::new();

    for order in ["00001234", "A-77"] {
        let response = http
            .get(format!("http://{}/orders/{order}/invoice", bridge.addr))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        assert_eq!(
            response.headers()["content-type"],
            "application/pdf"
        );
        assert_eq!(
            response.bytes().await.unwrap().as_ref(),
            b"%PDF-1.4 sample invoice"
        );
    }
}
