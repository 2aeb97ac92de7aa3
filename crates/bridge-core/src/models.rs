// ABOUTME: Credential, session, and agent response models shared by the bridge
// ABOUTME: AuthToken and its state machine, session states, streamed events, sync replies
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::agent_api::API_BASE_PATH;

/// Access token granted by the client-credentials exchange
///
/// No expiry is tracked; a token is replaced only by re-authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    /// Bearer token value
    pub access_token: String,
    /// Instance URL subsequent API calls are addressed to
    pub api_instance_url: String,
    /// Scopes granted with the token
    pub scopes: HashSet<String>,
    /// When the token was obtained
    pub obtained_at: DateTime<Utc>,
}

impl AuthToken {
    /// Base URL for agent API calls made with this token
    #[must_use]
    pub fn api_base_url(&self) -> String {
        format!(
            "{}{API_BASE_PATH}",
            self.api_instance_url.trim_end_matches('/')
        )
    }

    /// `Authorization` header value
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

// Never print the token itself
impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("access_token", &"<redacted>")
            .field("api_instance_url", &self.api_instance_url)
            .field("scopes", &self.scopes)
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

/// Lifecycle of the shared credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialState {
    /// No usable token; the next session operation authenticates
    Unauthenticated,
    /// A token exchange is in flight
    Authenticating,
    /// A token is cached
    Authenticated,
}

/// Lifecycle of one agent session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created and usable
    Open,
    /// Close requested; no further messages may be sent
    Closed,
}

/// One event received from the agent's streaming endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    /// SSE event name (`message` when the server did not name it)
    pub event: String,
    /// Event data parsed as JSON
    pub data: Value,
}

/// Reply to a single-shot message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReply {
    /// Text of every agent message, newline separated
    pub text: String,
    /// Full response body as returned by the agent API
    pub raw: Value,
}

impl SyncReply {
    /// Extract the reply from a `{messages: [{message: ..}, ..]}` body
    #[must_use]
    pub fn from_response(raw: Value) -> Self {
        let text = raw
            .get("messages")
            .and_then(Value::as_array)
            .map(|messages| {
                messages
                    .iter()
                    .filter_map(|m| m.get("message").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();
        Self { text, raw }
    }
}
