// ABOUTME: Main library entry point for the agent bridge
// ABOUTME: Relays browser WebSocket prompts to an external conversational agent API
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Agent Bridge
//!
//! A server-side bridge between browser clients connected over `WebSocket`
//! and an external conversational agent API.
//!
//! ## Architecture
//!
//! - **websocket**: connection registry, frame dispatch, liveness probing
//! - **`agent_api`**: OAuth client-credentials token, per-prompt sessions, sync
//!   and streamed messages
//! - **router**: turns client prompts into agent sessions and replies
//! - **relay**: forwards one streamed reply to the client that asked for it
//! - **routes** / **server**: axum transport and process wiring
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use agent_bridge::config::ServerConfig;
//! use agent_bridge::server::BridgeServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     BridgeServer::new(config).run().await
//! }
//! ```

/// External agent API client
pub mod agent_api;

/// Environment configuration
pub mod config;

/// Logging setup
pub mod logging;

/// Prompt routing from client connections to agent sessions
pub mod router;

/// Streamed reply forwarding
pub mod relay;

/// HTTP routes
pub mod routes;

/// Server wiring
pub mod server;

/// Shared helpers
pub mod utils;

/// Client connection registry
pub mod websocket;

pub use bridge_core::{
    constants, AgentEvent, BridgeError, BridgeResult, InboundMessage, OutboundMessage,
};
