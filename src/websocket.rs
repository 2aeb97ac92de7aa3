// ABOUTME: WebSocket connection registry for browser clients of the bridge
// ABOUTME: Tracks live connections, dispatches inbound frames, probes liveness, and broadcasts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

// NOTE: `.clone()` calls in this file are Arc clones handing connections and
// listeners to spawned tasks

//! `WebSocket` connection management
//!
//! Every accepted socket becomes a [`ClientConnection`] in the
//! [`ConnectionRegistry`]. Text frames are parsed into [`InboundMessage`]s and
//! handed to registered listeners; `pong` frames only refresh liveness.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::WebSocket;
use bridge_core::{BridgeError, BridgeResult, InboundMessage, OutboundMessage};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

// WebSocket message type alias for Axum
type Message = axum::extract::ws::Message;

/// Upper bound on flushing queued frames after a connection ends
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Callback invoked for every non-control frame a client sends
pub type MessageListener = Arc<dyn Fn(Arc<ClientConnection>, InboundMessage) + Send + Sync>;

/// One connected browser client
///
/// Outbound frames are queued on an unbounded channel drained by the socket's
/// writer task, so `send` never blocks.
#[derive(Debug)]
pub struct ClientConnection {
    id: Uuid,
    tx: mpsc::UnboundedSender<Message>,
    alive: AtomicBool,
    last_seen_ms: AtomicI64,
    connected_at: DateTime<Utc>,
    terminated: watch::Sender<bool>,
}

impl ClientConnection {
    /// Wrap the sending half of a connection's outbound queue
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<Message>) -> Self {
        let now = Utc::now();
        let (terminated, _) = watch::channel(false);
        Self {
            id: Uuid::new_v4(),
            tx,
            alive: AtomicBool::new(true),
            last_seen_ms: AtomicI64::new(now.timestamp_millis()),
            connected_at: now,
            terminated,
        }
    }

    /// Connection id
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// When the socket was accepted
    #[must_use]
    pub const fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Whether the client answered since the last probe
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Last pong time
    #[must_use]
    pub fn last_seen(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_seen_ms.load(Ordering::Acquire))
            .unwrap_or(self.connected_at)
    }

    /// Whether frames can still be delivered
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed() && !*self.terminated.borrow()
    }

    /// Queue a frame for the client
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Transport` if the connection is closed, or a
    /// serialization error if the frame cannot be encoded
    pub fn send(&self, message: &OutboundMessage) -> BridgeResult<()> {
        if !self.is_open() {
            return Err(BridgeError::transport(self.id, "connection closed"));
        }
        let text = message.to_json()?;
        self.tx
            .send(Message::Text(text))
            .map_err(|_| BridgeError::transport(self.id, "connection closed"))
    }

    /// Resolves once the connection has ended, whoever ended it
    pub async fn closed(&self) {
        let mut terminated = self.terminated.subscribe();
        tokio::select! {
            () = self.tx.closed() => {}
            _ = terminated.wait_for(|done| *done) => {}
        }
    }

    /// Close the socket from the server side
    ///
    /// Returns `true` for the call that actually terminated the connection.
    pub fn terminate(&self) -> bool {
        if self.terminated.send_replace(true) {
            return false;
        }
        // Peer may already be gone
        let _ = self.tx.send(Message::Close(None));
        true
    }

    fn acknowledge(&self) {
        self.alive.store(true, Ordering::Release);
        self.last_seen_ms
            .store(Utc::now().timestamp_millis(), Ordering::Release);
    }

    /// Clear the alive flag for a new probe round; returns the previous value
    fn begin_probe(&self) -> bool {
        self.alive.swap(false, Ordering::AcqRel)
    }
}

/// Result of one liveness probe round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeReport {
    /// Connections that were sent a ping
    pub pinged: usize,
    /// Connections terminated and removed
    pub evicted: usize,
}

/// Registry of live client connections
#[derive(Clone)]
pub struct ConnectionRegistry {
    connections: Arc<RwLock<HashMap<Uuid, Arc<ClientConnection>>>>,
    listeners: Arc<RwLock<Vec<MessageListener>>>,
    probe_interval: Duration,
}

impl ConnectionRegistry {
    /// Creates an empty registry probing at the given period
    #[must_use]
    pub fn new(probe_interval: Duration) -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            listeners: Arc::new(RwLock::new(Vec::new())),
            probe_interval,
        }
    }

    /// Add a connection
    pub async fn register(&self, connection: Arc<ClientConnection>) {
        let mut connections = self.connections.write().await;
        connections.insert(connection.id(), connection);
        debug!(total = connections.len(), "Client connection registered");
    }

    /// Remove a connection
    pub async fn unregister(&self, id: Uuid) -> Option<Arc<ClientConnection>> {
        self.connections.write().await.remove(&id)
    }

    /// Look up a connection
    pub async fn get(&self, id: Uuid) -> Option<Arc<ClientConnection>> {
        self.connections.read().await.get(&id).cloned()
    }

    /// Number of registered connections
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Register a listener; listeners run in registration order
    pub async fn add_listener<F>(&self, listener: F)
    where
        F: Fn(Arc<ClientConnection>, InboundMessage) + Send + Sync + 'static,
    {
        self.listeners.write().await.push(Arc::new(listener));
    }

    /// Parse one text frame from a client and dispatch it
    ///
    /// Malformed frames are logged and dropped; the connection stays open.
    pub async fn dispatch_frame(&self, connection: &Arc<ClientConnection>, text: &str) {
        let message = match InboundMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    connection_id = %connection.id(),
                    error = %e,
                    "Dropping malformed client frame"
                );
                return;
            }
        };

        if message.is_control() {
            connection.acknowledge();
            return;
        }

        let listeners = self.listeners.read().await.clone();
        for listener in &listeners {
            listener(connection.clone(), message.clone());
        }
    }

    /// Run one liveness round
    ///
    /// Connections that did not answer the previous ping are terminated and
    /// removed; the rest are marked pending and pinged.
    pub async fn probe_liveness(&self) -> ProbeReport {
        let snapshot: Vec<Arc<ClientConnection>> =
            self.connections.read().await.values().cloned().collect();

        let mut report = ProbeReport::default();
        let mut stale = Vec::new();
        for connection in snapshot {
            if !connection.is_open() || !connection.begin_probe() {
                connection.terminate();
                stale.push(connection.id());
                continue;
            }
            if let Err(e) = connection.send(&OutboundMessage::Ping) {
                warn!(connection_id = %connection.id(), error = %e, "Failed to send ping");
            }
            report.pinged += 1;
        }

        if !stale.is_empty() {
            let mut connections = self.connections.write().await;
            for id in &stale {
                if connections.remove(id).is_some() {
                    report.evicted += 1;
                    info!(connection_id = %id, "Evicted unresponsive client connection");
                }
            }
        }
        report
    }

    /// Spawn the periodic liveness probe
    pub fn start_liveness_probe(&self) -> JoinHandle<()> {
        let registry = self.clone();
        let period = self.probe_interval;
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let report = registry.probe_liveness().await;
                debug!(
                    pinged = report.pinged,
                    evicted = report.evicted,
                    "Liveness probe complete"
                );
            }
        })
    }

    /// Send a frame to every open connection; returns how many were reached
    pub async fn broadcast(&self, message: &OutboundMessage) -> usize {
        let connections = self.connections.read().await;
        let mut delivered = 0;
        for connection in connections.values() {
            match connection.send(message) {
                Ok(()) => delivered += 1,
                Err(e) => debug!(
                    connection_id = %connection.id(),
                    error = %e,
                    "Skipping connection during broadcast"
                ),
            }
        }
        delivered
    }

    /// Drive an upgraded socket until either side closes it
    pub async fn handle_socket(&self, socket: WebSocket) {
        let (mut ws_tx, mut ws_rx) = socket.split();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let connection = Arc::new(ClientConnection::new(tx));
        let connection_id = connection.id();

        // Spawn task to forward queued frames to the socket
        let mut writer = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if ws_tx.send(message).await.is_err() || closing {
                    break;
                }
            }
        });

        self.register(connection.clone()).await;
        info!(%connection_id, "Client connected");

        loop {
            tokio::select! {
                () = connection.closed() => break,
                frame = ws_rx.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.dispatch_frame(&connection, &text).await,
                    Some(Ok(Message::Pong(_))) => connection.acknowledge(),
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    Some(Ok(_)) => {}
                },
            }
        }

        connection.terminate();
        if timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
            writer.abort();
        }
        self.unregister(connection_id).await;
        let remaining = self.connection_count().await;
        info!(%connection_id, remaining, "Client disconnected");
    }
}
