// ABOUTME: Health check route for the bridge process
// ABOUTME: Reports status, version, and the number of connected clients
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::websocket::ConnectionRegistry;

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create the health route
    pub fn routes(registry: ConnectionRegistry) -> Router {
        Router::new()
            .route("/health", get(Self::health_handler))
            .with_state(registry)
    }

    async fn health_handler(State(registry): State<ConnectionRegistry>) -> Json<Value> {
        Json(json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "connections": registry.connection_count().await,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }))
    }
}
