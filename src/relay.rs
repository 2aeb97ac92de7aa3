// ABOUTME: Forwards one streamed agent reply to the client connection that asked for it
// ABOUTME: Relays events in order, reports the terminal outcome, and always closes the session
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use bridge_core::OutboundMessage;
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::agent_api::{AgentEventStream, AgentSession, AgentSessionClient};
use crate::websocket::ClientConnection;

/// How a relay ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The agent ended the stream normally
    Completed {
        /// Events received from the agent
        events: usize,
    },
    /// The stream broke; the client got one `prompt-error`
    Failed {
        /// Events received before the failure
        events: usize,
        /// Failure description
        reason: String,
    },
    /// The client went away first
    Abandoned {
        /// Events received before the disconnect
        events: usize,
    },
}

/// Relay for one streamed prompt
///
/// Owns the session; it is closed exactly once when the relay ends, whichever
/// way it ends.
pub struct StreamRelay {
    client: Arc<AgentSessionClient>,
    connection: Arc<ClientConnection>,
    session: AgentSession,
}

impl StreamRelay {
    /// Bind a session to the connection its events go to
    #[must_use]
    pub const fn new(
        client: Arc<AgentSessionClient>,
        connection: Arc<ClientConnection>,
        session: AgentSession,
    ) -> Self {
        Self {
            client,
            connection,
            session,
        }
    }

    /// Run the relay on its own task
    pub fn spawn(self, stream: AgentEventStream) -> JoinHandle<RelayOutcome> {
        tokio::spawn(self.run(stream))
    }

    /// Forward events until the stream ends or the client disconnects
    pub async fn run(self, mut stream: AgentEventStream) -> RelayOutcome {
        let session_id = self.session.id().to_owned();
        let connection_id = self.connection.id();
        let mut events = 0;

        let outcome = loop {
            tokio::select! {
                biased;
                () = self.connection.closed() => {
                    break RelayOutcome::Abandoned { events };
                }
                item = stream.next() => match item {
                    Some(Ok(event)) => {
                        events += 1;
                        debug!(%session_id, event = %event.event, "Relaying agent event");
                        self.notify(&OutboundMessage::response(event.data));
                    }
                    Some(Err(e)) => {
                        error!(%session_id, %connection_id, error = %e, "Agent event stream failed");
                        self.notify(&OutboundMessage::error(&e));
                        break RelayOutcome::Failed { events, reason: e.to_string() };
                    }
                    None => {
                        self.notify(&OutboundMessage::PromptComplete);
                        break RelayOutcome::Completed { events };
                    }
                },
            }
        };

        stream.close();
        if let Err(e) = self.client.close_session(&self.session).await {
            warn!(%session_id, error = %e, "Failed to close agent session after relay");
        }
        info!(%session_id, %connection_id, outcome = ?outcome, "Stream relay finished");
        outcome
    }

    fn notify(&self, message: &OutboundMessage) {
        if let Err(e) = self.connection.send(message) {
            debug!(connection_id = %self.connection.id(), error = %e, "Client frame not delivered");
        }
    }
}
