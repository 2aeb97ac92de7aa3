// ABOUTME: HTTP surface of the bridge: WebSocket upgrade, health, invoices, and static assets
// ABOUTME: Assembles the axum router with compression and request tracing layers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Route assembly
//!
//! Anything not matched by the upgrade, health, or invoice routes is served
//! from the static asset directory.

use std::path::Path;

use axum::Router;
use tower::Layer;
use tower_http::{compression::CompressionLayer, services::ServeDir, trace::TraceLayer};

use crate::websocket::ConnectionRegistry;

/// Health check route
pub mod health;
/// Sample invoice download
pub mod invoice;
/// WebSocket upgrade route
pub mod websocket;

pub use health::HealthRoutes;
pub use invoice::InvoiceRoutes;
pub use websocket::WebSocketRoutes;

/// Build the complete application router
pub fn router(registry: &ConnectionRegistry, public_dir: &Path) -> Router {
    let assets = CompressionLayer::new().layer(ServeDir::new(public_dir));

    Router::new()
        .merge(WebSocketRoutes::routes(registry.clone()))
        .merge(HealthRoutes::routes(registry.clone()))
        .merge(InvoiceRoutes::routes(public_dir))
        .fallback_service(assets)
        .layer(TraceLayer::new_for_http())
}
