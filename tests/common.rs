// ABOUTME: Shared test utilities and a mock agent API for integration tests
// ABOUTME: Provides logging setup, an axum-based agent API double, and client connection helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::too_many_lines
)]
//! Shared test utilities for `agent_bridge`
//!
//! The mock agent API speaks the same endpoints as the real one and records
//! every call so tests can assert on what the bridge sent.

use std::io;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use agent_bridge::agent_api::AgentSessionClient;
use agent_bridge::config::AgentApiConfig;
use agent_bridge::websocket::ClientConnection;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, post},
    Json, Router,
};
use futures_util::stream::{self, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            Ok("WARN" | "ERROR") | _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// How the mock ends a streamed reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// Send every configured event, then end the body
    Complete,
    /// Send every configured event, then abort the body
    FailAfterEvents,
    /// Send every configured event, then keep the body open forever
    HoldOpen,
}

/// Recorded calls and behavior switches of the mock agent API
pub struct MockAgentState {
    pub base_url: Mutex<String>,
    /// API host returned with issued tokens; differs from the instance URL like the real service
    pub api_instance_url: Mutex<String>,
    pub granted_scope: Mutex<String>,
    pub token_status: AtomicU16,
    pub create_status: AtomicU16,
    pub message_status: AtomicU16,
    pub close_status: AtomicU16,
    pub feedback_status: AtomicU16,
    /// Number of upcoming authenticated calls answered with 401
    pub reject_calls: AtomicUsize,
    pub reply: Mutex<Value>,
    pub stream_events: Mutex<Vec<(String, String)>>,
    pub stream_mode: Mutex<StreamMode>,

    pub token_bodies: Mutex<Vec<String>>,
    pub tokens_issued: AtomicUsize,
    pub sessions_created: AtomicUsize,
    pub create_bodies: Mutex<Vec<Value>>,
    pub authorizations: Mutex<Vec<String>>,
    pub messages: Mutex<Vec<(String, Value)>>,
    pub stream_requests: Mutex<Vec<(String, Value)>>,
    pub closed_sessions: Mutex<Vec<(String, Option<String>)>>,
    pub feedback: Mutex<Vec<(String, Value)>>,
}

impl Default for MockAgentState {
    fn default() -> Self {
        Self {
            base_url: Mutex::new(String::new()),
            api_instance_url: Mutex::new(String::new()),
            granted_scope: Mutex::new("api sfap_api chatbot_api".to_owned()),
            token_status: AtomicU16::new(200),
            create_status: AtomicU16::new(200),
            message_status: AtomicU16::new(200),
            close_status: AtomicU16::new(200),
            feedback_status: AtomicU16::new(200),
            reject_calls: AtomicUsize::new(0),
            reply: Mutex::new(json!({
                "messages": [{"type": "Inform", "message": "Here are 3 courses..."}]
            })),
            stream_events: Mutex::new(Vec::new()),
            stream_mode: Mutex::new(StreamMode::Complete),
            token_bodies: Mutex::new(Vec::new()),
            tokens_issued: AtomicUsize::new(0),
            sessions_created: AtomicUsize::new(0),
            create_bodies: Mutex::new(Vec::new()),
            authorizations: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
            stream_requests: Mutex::new(Vec::new()),
            closed_sessions: Mutex::new(Vec::new()),
            feedback: Mutex::new(Vec::new()),
        }
    }
}

type MockState = Arc<MockAgentState>;

fn status(code: &AtomicU16) -> StatusCode {
    StatusCode::from_u16(code.load(Ordering::SeqCst)).unwrap()
}

fn check_auth(state: &MockAgentState, headers: &HeaderMap) -> Result<(), Response> {
    let rejected = state
        .reject_calls
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if rejected {
        return Err((StatusCode::UNAUTHORIZED, "token expired").into_response());
    }

    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    if !authorization.starts_with("Bearer token-") {
        return Err((StatusCode::UNAUTHORIZED, "missing bearer token").into_response());
    }
    state.authorizations.lock().unwrap().push(authorization);
    Ok(())
}

async fn token_handler(State(state): State<MockState>, body: String) -> Response {
    state.token_bodies.lock().unwrap().push(body);
    let code = status(&state.token_status);
    if !code.is_success() {
        return (code, Json(json!({"error": "invalid_client"}))).into_response();
    }

    let n = state.tokens_issued.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({
        "access_token": format!("token-{n}"),
        "token_type": "Bearer",
        "scope": state.granted_scope.lock().unwrap().clone(),
        "api_instance_url": state.api_instance_url.lock().unwrap().clone(),
    }))
    .into_response()
}

async fn create_session_handler(
    State(state): State<MockState>,
    Path(_agent_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = check_auth(&state, &headers) {
        return rejection;
    }
    let code = status(&state.create_status);
    if !code.is_success() {
        return (code, "session refused").into_response();
    }

    state.create_bodies.lock().unwrap().push(body);
    let n = state.sessions_created.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({"sessionId": format!("S{n}"), "messages": []})).into_response()
}

async fn message_handler(
    State(state): State<MockState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = check_auth(&state, &headers) {
        return rejection;
    }
    let code = status(&state.message_status);
    if !code.is_success() {
        return (code, "message failed").into_response();
    }

    state.messages.lock().unwrap().push((session_id, body));
    Json(state.reply.lock().unwrap().clone()).into_response()
}

async fn stream_handler(
    State(state): State<MockState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = check_auth(&state, &headers) {
        return rejection;
    }
    let code = status(&state.message_status);
    if !code.is_success() {
        return (code, "stream refused").into_response();
    }
    state.stream_requests.lock().unwrap().push((session_id, body));

    let chunks: Vec<Result<String, io::Error>> = state
        .stream_events
        .lock()
        .unwrap()
        .iter()
        .map(|(event, data)| Ok(format!("event: {event}\ndata: {data}\n\n")))
        .collect();

    let mode = *state.stream_mode.lock().unwrap();
    let body = match mode {
        StreamMode::Complete => Body::from_stream(stream::iter(chunks)),
        StreamMode::FailAfterEvents => {
            // Let the head and earlier events reach the client before the body breaks
            let abort = stream::once(async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Err(io::Error::other("agent stream aborted"))
            });
            Body::from_stream(stream::iter(chunks).chain(abort))
        }
        StreamMode::HoldOpen => {
            Body::from_stream(stream::iter(chunks).chain(stream::pending()))
        }
    };

    Response::builder()
        .header("content-type", "text/event-stream")
        .body(body)
        .unwrap()
}

async fn close_handler(
    State(state): State<MockState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(rejection) = check_auth(&state, &headers) {
        return rejection;
    }
    let reason = headers
        .get("x-session-end-reason")
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned);
    state
        .closed_sessions
        .lock()
        .unwrap()
        .push((session_id, reason));
    status(&state.close_status).into_response()
}

async fn feedback_handler(
    State(state): State<MockState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = check_auth(&state, &headers) {
        return rejection;
    }
    state.feedback.lock().unwrap().push((session_id, body));
    status(&state.feedback_status).into_response()
}

/// Running mock agent API
pub struct MockAgentApi {
    pub base_url: String,
    pub state: MockState,
    server: JoinHandle<()>,
}

impl MockAgentApi {
    /// Serve the mock on an ephemeral local port
    pub async fn start() -> Self {
        init_test_logging();

        let state = Arc::new(MockAgentState::default());
        let app = Router::new()
            .route("/services/oauth2/token", post(token_handler))
            .route(
                "/einstein/ai-agent/v1/agents/:agent_id/sessions",
                post(create_session_handler),
            )
            .route(
                "/einstein/ai-agent/v1/sessions/:session_id",
                delete(close_handler),
            )
            .route(
                "/einstein/ai-agent/v1/sessions/:session_id/messages",
                post(message_handler),
            )
            .route(
                "/einstein/ai-agent/v1/sessions/:session_id/messages/stream",
                post(stream_handler),
            )
            .route(
                "/einstein/ai-agent/v1/sessions/:session_id/feedback",
                post(feedback_handler),
            )
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let base_url = format!("http://127.0.0.1:{port}");
        *state.base_url.lock().unwrap() = base_url.clone();
        *state.api_instance_url.lock().unwrap() = format!("http://localhost:{port}");

        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            state,
            server,
        }
    }

    /// Agent API settings pointing at this mock
    pub fn config(&self) -> AgentApiConfig {
        AgentApiConfig {
            instance_url: self.base_url.clone(),
            client_id: "test-client".to_owned(),
            client_secret: "test-secret".to_owned(),
            agent_id: "agent-1".to_owned(),
        }
    }

    /// Fresh agent client against this mock
    pub fn client(&self) -> Arc<AgentSessionClient> {
        Arc::new(AgentSessionClient::new(self.config()))
    }

    /// Configure the streamed reply
    pub fn set_stream(&self, events: &[(&str, Value)], mode: StreamMode) {
        *self.state.stream_events.lock().unwrap() = events
            .iter()
            .map(|(event, data)| ((*event).to_owned(), data.to_string()))
            .collect();
        *self.state.stream_mode.lock().unwrap() = mode;
    }

    /// Ids of every session the bridge closed, in order
    pub fn closed_session_ids(&self) -> Vec<String> {
        self.state
            .closed_sessions
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn token_requests(&self) -> usize {
        self.state.token_bodies.lock().unwrap().len()
    }

    pub fn sessions_created(&self) -> usize {
        self.state.sessions_created.load(Ordering::SeqCst)
    }
}

impl Drop for MockAgentApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// A connection backed by an in-memory channel instead of a socket
pub fn connection_pair() -> (
    Arc<ClientConnection>,
    mpsc::UnboundedReceiver<axum::extract::ws::Message>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(ClientConnection::new(tx)), rx)
}

/// Next JSON text frame queued for a connection
pub async fn next_frame(rx: &mut mpsc::UnboundedReceiver<axum::extract::ws::Message>) -> Value {
    let message = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a frame")
        .expect("connection channel closed");
    match message {
        axum::extract::ws::Message::Text(text) => serde_json::from_str(&text).unwrap(),
        other => panic!("expected a text frame, got {other:?}"),
    }
}

/// Every JSON text frame currently queued, without waiting
pub fn queued_frames(rx: &mut mpsc::UnboundedReceiver<axum::extract::ws::Message>) -> Vec<Value> {
    let mut frames = Vec::new();
    while let Ok(message) = rx.try_recv() {
        if let axum::extract::ws::Message::Text(text) = message {
            frames.push(serde_json::from_str(&text).unwrap());
        }
    }
    frames
}
