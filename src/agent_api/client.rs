// ABOUTME: HTTP client for the external agent API session lifecycle
// ABOUTME: Creates sessions, sends sync and streaming messages, closes sessions, submits feedback
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use bridge_core::constants::agent_api::{
    SESSION_END_REASON, SESSION_END_REASON_HEADER, STREAMING_CHUNK_TYPES, TEXT_MESSAGE_TYPE,
};
use bridge_core::{AuthToken, BridgeError, BridgeResult, CredentialState, SyncReply};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::credentials::CredentialStore;
use super::session::AgentSession;
use super::stream::AgentEventStream;
use crate::config::AgentApiConfig;
use crate::utils::http_client;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionResponse {
    session_id: String,
}

/// Which call is in flight; decides the error variant a failure maps to
#[derive(Debug, Clone, Copy)]
enum Operation<'a> {
    CreateSession,
    SendMessage(&'a str),
    StreamMessage(&'a str),
    CloseSession(&'a str),
    Feedback(&'a str),
}

impl Operation<'_> {
    const fn name(self) -> &'static str {
        match self {
            Self::CreateSession => "create_session",
            Self::SendMessage(_) => "send_message",
            Self::StreamMessage(_) => "stream_message",
            Self::CloseSession(_) => "close_session",
            Self::Feedback(_) => "submit_feedback",
        }
    }

    fn error(self, status: Option<u16>, reason: impl Into<String>) -> BridgeError {
        match self {
            Self::CreateSession => BridgeError::session("create", None, status, reason),
            Self::CloseSession(id) => BridgeError::session("close", Some(id), status, reason),
            Self::SendMessage(id) | Self::StreamMessage(id) | Self::Feedback(id) => {
                BridgeError::message(id, status, reason)
            }
        }
    }
}

/// Agent API client shared by all connections
///
/// Holds the one process-wide credential; every operation authenticates on
/// demand and retries once with a fresh token when the API answers 401.
pub struct AgentSessionClient {
    config: AgentApiConfig,
    http: Client,
    credentials: CredentialStore,
}

impl AgentSessionClient {
    /// Create a client; no network traffic happens until the first operation
    #[must_use]
    pub fn new(config: AgentApiConfig) -> Self {
        Self {
            credentials: CredentialStore::new(config.clone()),
            http: http_client::api_client(),
            config,
        }
    }

    /// Credential holder
    #[must_use]
    pub const fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Current credential state
    pub async fn credential_state(&self) -> CredentialState {
        self.credentials.state().await
    }

    /// Force a token exchange
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Auth` or `BridgeError::Scope` if the exchange fails
    pub async fn authenticate(&self) -> BridgeResult<()> {
        self.credentials.authenticate().await.map(|_| ())
    }

    /// Open a new agent session on behalf of a client connection
    ///
    /// # Errors
    ///
    /// Returns an auth error if no token can be obtained, or `BridgeError::Session`
    /// if the agent API refuses the session
    pub async fn create_session(&self, owner: Uuid) -> BridgeResult<AgentSession> {
        let op = Operation::CreateSession;
        let agent_id = self.config.agent_id.as_str();
        let instance_url = self.config.instance_url.as_str();
        let external_key = Uuid::new_v4();

        let response = self
            .send_authorized(op, |http, token| {
                let endpoint = format!("{}/agents/{agent_id}/sessions", token.api_base_url());
                let body = json!({
                    "externalSessionKey": external_key,
                    "instanceConfig": { "endpoint": instance_url },
                    "streamingCapabilities": { "chunkTypes": STREAMING_CHUNK_TYPES },
                });
                http.post(endpoint).json(&body)
            })
            .await?;
        let response = ensure_success(op, response).await?;

        let body: CreateSessionResponse = response
            .json()
            .await
            .map_err(|e| op.error(None, format!("Invalid session response: {e}")))?;

        info!(
            session_id = %body.session_id,
            connection_id = %owner,
            "Agent session created"
        );
        Ok(AgentSession::new(body.session_id, owner))
    }

    /// Send a prompt and wait for the complete reply
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Message` if the send fails or the reply cannot be decoded
    pub async fn send_sync_message(
        &self,
        session: &AgentSession,
        text: &str,
        variables: &[Value],
    ) -> BridgeResult<SyncReply> {
        let op = Operation::SendMessage(session.id());
        let body = message_body(session, text, variables);

        let response = self
            .send_authorized(op, |http, token| {
                http.post(format!(
                    "{}/sessions/{}/messages",
                    token.api_base_url(),
                    session.id()
                ))
                .json(&body)
            })
            .await?;
        let response = ensure_success(op, response).await?;

        let raw: Value = response
            .json()
            .await
            .map_err(|e| op.error(None, format!("Invalid message response: {e}")))?;
        debug!(session_id = %session.id(), "Sync reply received");
        Ok(SyncReply::from_response(raw))
    }

    /// Send a prompt and return its event stream
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Message` if the stream cannot be opened
    pub async fn send_streaming_message(
        &self,
        session: &AgentSession,
        text: &str,
        variables: &[Value],
    ) -> BridgeResult<AgentEventStream> {
        let op = Operation::StreamMessage(session.id());
        let body = message_body(session, text, variables);

        let response = self
            .send_authorized(op, |http, token| {
                http.post(format!(
                    "{}/sessions/{}/messages/stream",
                    token.api_base_url(),
                    session.id()
                ))
                .header(ACCEPT, "text/event-stream")
                .json(&body)
            })
            .await?;
        let response = ensure_success(op, response).await?;

        debug!(session_id = %session.id(), "Event stream opened");
        Ok(AgentEventStream::from_bytes(
            session.id(),
            response.bytes_stream(),
        ))
    }

    /// End a session
    ///
    /// Closing an already-closed session is a no-op, and a session the agent API
    /// no longer knows (404/410) counts as closed.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Session` if the agent API fails the request
    pub async fn close_session(&self, session: &AgentSession) -> BridgeResult<()> {
        if !session.mark_closed() {
            debug!(session_id = %session.id(), "Session already closed");
            return Ok(());
        }

        let op = Operation::CloseSession(session.id());
        let response = self
            .send_authorized(op, |http, token| {
                http.delete(format!("{}/sessions/{}", token.api_base_url(), session.id()))
                    .header(SESSION_END_REASON_HEADER, SESSION_END_REASON)
            })
            .await?;

        match response.status() {
            status if status.is_success() => {
                info!(session_id = %session.id(), "Agent session closed");
                Ok(())
            }
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                info!(session_id = %session.id(), "Agent session already ended remotely");
                Ok(())
            }
            _ => ensure_success(op, response).await.map(|_| ()),
        }
    }

    /// Record feedback on an agent answer
    ///
    /// Failures are logged and never propagated.
    pub async fn submit_feedback(
        &self,
        session_id: &str,
        feedback_id: &str,
        feedback: &str,
        text: Option<&str>,
    ) {
        let op = Operation::Feedback(session_id);
        let mut body = json!({ "feedbackId": feedback_id, "feedback": feedback });
        if let Some(text) = text {
            body["text"] = Value::String(text.to_owned());
        }

        let result = match self
            .send_authorized(op, |http, token| {
                http.post(format!(
                    "{}/sessions/{session_id}/feedback",
                    token.api_base_url()
                ))
                .json(&body)
            })
            .await
        {
            Ok(response) => ensure_success(op, response).await.map(|_| ()),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => debug!(session_id, feedback_id, "Feedback submitted"),
            Err(e) => warn!(session_id, feedback_id, error = %e, "Feedback submission failed"),
        }
    }

    /// Issue an authenticated request, re-authenticating and retrying once on 401
    async fn send_authorized<F>(&self, op: Operation<'_>, build: F) -> BridgeResult<Response>
    where
        F: Fn(&Client, &AuthToken) -> RequestBuilder,
    {
        let token = self.credentials.token().await?;
        let response = self.execute(op, build(&self.http, &token), &token).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        warn!(operation = op.name(), "Access token rejected, re-authenticating");
        self.credentials.invalidate(&token).await;
        let token = self.credentials.token().await?;

        let response = self.execute(op, build(&self.http, &token), &token).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            self.credentials.invalidate(&token).await;
        }
        Ok(response)
    }

    async fn execute(
        &self,
        op: Operation<'_>,
        request: RequestBuilder,
        token: &AuthToken,
    ) -> BridgeResult<Response> {
        request
            .header(AUTHORIZATION, token.bearer())
            .send()
            .await
            .map_err(|e| op.error(None, format!("Agent API unreachable: {e}")))
    }
}

fn message_body(session: &AgentSession, text: &str, variables: &[Value]) -> Value {
    json!({
        "message": {
            "sequenceId": session.next_sequence_id(),
            "type": TEXT_MESSAGE_TYPE,
            "text": text,
        },
        "variables": variables,
    })
}

async fn ensure_success(op: Operation<'_>, response: Response) -> BridgeResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(op.error(
        Some(status.as_u16()),
        format!("Agent API returned {status}: {body}"),
    ))
}
