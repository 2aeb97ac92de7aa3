// ABOUTME: WebSocket upgrade route for browser clients of the bridge
// ABOUTME: Upgrades the HTTP request and hands the socket to the connection registry
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use bridge_core::constants::network::WEBSOCKET_PATH;
use tracing::{debug, info};

use crate::websocket::ConnectionRegistry;

/// WebSocket routes implementation
pub struct WebSocketRoutes;

impl WebSocketRoutes {
    /// Create the upgrade route backed by the given registry
    pub fn routes(registry: ConnectionRegistry) -> Router {
        Router::new()
            .route(WEBSOCKET_PATH, get(Self::handle_websocket))
            .with_state(registry)
    }

    /// Upgrade to a WebSocket and let the registry drive it until it closes
    async fn handle_websocket(
        ws: WebSocketUpgrade,
        State(registry): State<ConnectionRegistry>,
    ) -> impl IntoResponse {
        info!("New WebSocket connection request");

        ws.on_upgrade(move |socket: WebSocket| async move {
            debug!("WebSocket upgraded, delegating to registry");
            registry.handle_socket(socket).await;
        })
    }
}
