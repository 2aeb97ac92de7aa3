// ABOUTME: Error taxonomy for the agent bridge
// ABOUTME: Typed errors for auth, scope, session, message, transport, and config failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use uuid::Uuid;

/// Result alias used across the bridge
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors raised while bridging client connections to the agent API
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Client-credentials exchange failed (bad credentials, HTTP failure, unreachable host)
    #[error("Authentication failed{}: {reason}", status_suffix(.status))]
    Auth {
        /// HTTP status returned by the token endpoint, if any
        status: Option<u16>,
        /// Failure description
        reason: String,
    },

    /// Granted scope set is missing at least one required scope
    #[error("Missing OAuth scopes: required {required:?}, granted {granted:?}")]
    Scope {
        /// Scopes the bridge requires
        required: Vec<String>,
        /// Scopes the token endpoint actually granted
        granted: Vec<String>,
    },

    /// Session creation or termination failed
    #[error("Session {operation} failed{}{}: {reason}", session_suffix(.session_id), status_suffix(.status))]
    Session {
        /// `create` or `close`
        operation: &'static str,
        /// Session identifier when known
        session_id: Option<String>,
        /// HTTP status when the agent API answered
        status: Option<u16>,
        /// Failure description
        reason: String,
    },

    /// Sync or streaming message send failed, or the stream broke mid-way
    #[error("Message send failed for session {session_id}{}: {reason}", status_suffix(.status))]
    Message {
        /// Session the message was addressed to
        session_id: String,
        /// HTTP status when the agent API answered
        status: Option<u16>,
        /// Failure description
        reason: String,
    },

    /// Sending a frame to a client connection failed
    #[error("Transport error on connection {connection_id}: {reason}")]
    Transport {
        /// Connection the frame was addressed to
        connection_id: Uuid,
        /// Failure description
        reason: String,
    },

    /// JSON encoding or decoding failed
    #[error("Serialization failed for {context}")]
    Serialization {
        /// What was being (de)serialized
        context: &'static str,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// Configuration value missing or invalid
    #[error("Configuration error for {key}: {reason}")]
    Config {
        /// Configuration key
        key: &'static str,
        /// Failure description
        reason: String,
    },
}

impl BridgeError {
    /// Create an authentication error
    pub fn auth(status: Option<u16>, reason: impl Into<String>) -> Self {
        Self::Auth {
            status,
            reason: reason.into(),
        }
    }

    /// Create a session error
    pub fn session(
        operation: &'static str,
        session_id: Option<&str>,
        status: Option<u16>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Session {
            operation,
            session_id: session_id.map(ToOwned::to_owned),
            status,
            reason: reason.into(),
        }
    }

    /// Create a message error
    pub fn message(session_id: &str, status: Option<u16>, reason: impl Into<String>) -> Self {
        Self::Message {
            session_id: session_id.to_owned(),
            status,
            reason: reason.into(),
        }
    }

    /// Create a transport error
    pub fn transport(connection_id: Uuid, reason: impl Into<String>) -> Self {
        Self::Transport {
            connection_id,
            reason: reason.into(),
        }
    }

    /// Stable short code reported to clients in `prompt-error` frames
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "auth",
            Self::Scope { .. } => "scope",
            Self::Session { .. } => "session",
            Self::Message { .. } => "message",
            Self::Transport { .. } => "transport",
            Self::Serialization { .. } => "serialization",
            Self::Config { .. } => "config",
        }
    }
}

#[allow(clippy::ref_option)] // thiserror hands format helpers a reference to the field
fn status_suffix(status: &Option<u16>) -> String {
    status.map_or_else(String::new, |code| format!(" (HTTP {code})"))
}

#[allow(clippy::ref_option)]
fn session_suffix(session_id: &Option<String>) -> String {
    session_id
        .as_deref()
        .map_or_else(String::new, |id| format!(" for {id}"))
}
