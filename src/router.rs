// ABOUTME: Routes client prompts to agent sessions and replies on the originating connection
// ABOUTME: Sync prompts get one response frame; async prompts are handed to a stream relay
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Prompt routing
//!
//! Each prompt runs in its own agent session, created on arrival and closed
//! once the reply (or failure) has been delivered.

use std::sync::Arc;

use bridge_core::{BridgeError, InboundMessage, OutboundMessage};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::agent_api::{AgentSession, AgentSessionClient};
use crate::relay::{RelayOutcome, StreamRelay};
use crate::websocket::{ClientConnection, ConnectionRegistry};

/// What happened to one routed client frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome {
    /// A sync prompt was answered with one `prompt-response`
    Answered,
    /// An async prompt was streamed; carries the relay result
    Streamed(RelayOutcome),
    /// The prompt failed before a reply; the client got one `prompt-error`
    Failed {
        /// Error code sent to the client
        code: &'static str,
    },
    /// The client went away before a sync reply was ready
    Abandoned,
    /// The frame type is not handled
    Ignored,
}

/// Dispatches prompts from client connections to the agent API
pub struct MessageRouter {
    client: Arc<AgentSessionClient>,
}

impl MessageRouter {
    /// Create a router over the shared agent client
    #[must_use]
    pub const fn new(client: Arc<AgentSessionClient>) -> Self {
        Self { client }
    }

    /// Subscribe to a registry; every prompt is handled on its own task
    pub async fn attach(self: &Arc<Self>, registry: &ConnectionRegistry) {
        let router = Arc::clone(self);
        registry
            .add_listener(move |connection, message| {
                let router = Arc::clone(&router);
                tokio::spawn(async move {
                    router.route(connection, message).await;
                });
            })
            .await;
    }

    /// Handle one inbound frame for a connection
    pub async fn route(
        &self,
        connection: Arc<ClientConnection>,
        message: InboundMessage,
    ) -> PromptOutcome {
        match message {
            InboundMessage::SyncPrompt { prompt, variables } => {
                self.handle_sync_prompt(&connection, &prompt, &variables)
                    .await
            }
            InboundMessage::AsyncPrompt { prompt, variables } => {
                self.handle_async_prompt(connection, &prompt, &variables)
                    .await
            }
            InboundMessage::Pong | InboundMessage::Unsupported => {
                debug!(connection_id = %connection.id(), "Ignoring unsupported client frame");
                PromptOutcome::Ignored
            }
        }
    }

    async fn handle_sync_prompt(
        &self,
        connection: &ClientConnection,
        prompt: &str,
        variables: &[Value],
    ) -> PromptOutcome {
        let session = match self.client.create_session(connection.id()).await {
            Ok(session) => session,
            Err(e) => return Self::fail(connection, &e),
        };

        let reply = tokio::select! {
            biased;
            () = connection.closed() => None,
            reply = self.client.send_sync_message(&session, prompt, variables) => Some(reply),
        };

        let outcome = match reply {
            None => {
                debug!(session_id = %session.id(), "Client left before the sync reply");
                PromptOutcome::Abandoned
            }
            Some(Ok(reply)) => {
                if let Err(e) = connection.send(&OutboundMessage::response(Value::String(reply.text)))
                {
                    warn!(connection_id = %connection.id(), error = %e, "Sync reply not delivered");
                }
                info!(session_id = %session.id(), "Sync prompt answered");
                PromptOutcome::Answered
            }
            Some(Err(e)) => Self::fail(connection, &e),
        };

        self.close_quietly(&session).await;
        outcome
    }

    async fn handle_async_prompt(
        &self,
        connection: Arc<ClientConnection>,
        prompt: &str,
        variables: &[Value],
    ) -> PromptOutcome {
        let session = match self.client.create_session(connection.id()).await {
            Ok(session) => session,
            Err(e) => return Self::fail(&connection, &e),
        };

        match self
            .client
            .send_streaming_message(&session, prompt, variables)
            .await
        {
            Ok(stream) => {
                let relay = StreamRelay::new(Arc::clone(&self.client), connection, session);
                PromptOutcome::Streamed(relay.run(stream).await)
            }
            Err(e) => {
                let outcome = Self::fail(&connection, &e);
                self.close_quietly(&session).await;
                outcome
            }
        }
    }

    fn fail(connection: &ClientConnection, e: &BridgeError) -> PromptOutcome {
        error!(connection_id = %connection.id(), error = %e, "Prompt failed");
        if let Err(send_err) = connection.send(&OutboundMessage::error(e)) {
            debug!(connection_id = %connection.id(), error = %send_err, "Error frame not delivered");
        }
        PromptOutcome::Failed { code: e.code() }
    }

    async fn close_quietly(&self, session: &AgentSession) {
        if let Err(e) = self.client.close_session(session).await {
            warn!(session_id = %session.id(), error = %e, "Failed to close agent session");
        }
    }
}
