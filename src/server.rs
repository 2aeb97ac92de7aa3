// ABOUTME: Bridge server wiring: agent client, connection registry, router, and HTTP listener
// ABOUTME: Serves the axum app until Ctrl-C and stops the liveness probe on the way out
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::agent_api::AgentSessionClient;
use crate::config::ServerConfig;
use crate::router::MessageRouter;
use crate::routes;
use crate::websocket::ConnectionRegistry;

/// The bridge process: one registry, one agent client, one router
pub struct BridgeServer {
    config: ServerConfig,
    registry: ConnectionRegistry,
    client: Arc<AgentSessionClient>,
    router: Arc<MessageRouter>,
}

impl BridgeServer {
    /// Build the components; nothing is bound or spawned yet
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let client = Arc::new(AgentSessionClient::new(config.agent.clone()));
        let router = Arc::new(MessageRouter::new(Arc::clone(&client)));
        let registry = ConnectionRegistry::new(config.ping_interval);
        Self {
            config,
            registry,
            client,
            router,
        }
    }

    /// Connection registry
    #[must_use]
    pub const fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Shared agent client
    #[must_use]
    pub const fn client(&self) -> &Arc<AgentSessionClient> {
        &self.client
    }

    /// Attach the router to the registry and build the HTTP app
    pub async fn app(&self) -> Router {
        self.router.attach(&self.registry).await;
        routes::router(&self.registry, &self.config.public_dir)
    }

    /// Bind the configured address and serve until Ctrl-C
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound or the server fails
    pub async fn run(self) -> Result<()> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP server fails
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let app = self.app().await;
        let probe = self.registry.start_liveness_probe();

        info!(
            addr = %listener.local_addr().context("Listener has no local address")?,
            "Agent bridge listening"
        );
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .context("HTTP server failed");

        probe.abort();
        info!("Agent bridge stopped");
        result
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C; running until killed");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
