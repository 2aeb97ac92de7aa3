// ABOUTME: JSON frames exchanged with browser clients over the bridged WebSocket
// ABOUTME: Inbound prompt/pong envelopes and outbound ping/response/complete/error envelopes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{BridgeError, BridgeResult};

/// Frame received from a client, discriminated by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InboundMessage {
    /// Prompt answered with a single response frame
    SyncPrompt {
        /// Natural-language prompt
        prompt: String,
        /// Opaque variables forwarded to the agent unchanged
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        variables: Vec<Value>,
    },
    /// Prompt answered with one frame per streamed agent event
    AsyncPrompt {
        /// Natural-language prompt
        prompt: String,
        /// Opaque variables forwarded to the agent unchanged
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        variables: Vec<Value>,
    },
    /// Liveness acknowledgment; consumed by the connection registry
    Pong,
    /// Any other `type` value
    #[serde(other)]
    Unsupported,
}

impl InboundMessage {
    /// Parse a text frame
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Serialization` if the frame is not a JSON object with a
    /// string `type`, or a known type is missing its required fields.
    pub fn parse(text: &str) -> BridgeResult<Self> {
        serde_json::from_str(text).map_err(|source| BridgeError::Serialization {
            context: "inbound client frame",
            source,
        })
    }

    /// Whether this frame is a control frame that never reaches listeners
    #[must_use]
    pub const fn is_control(&self) -> bool {
        matches!(self, Self::Pong)
    }
}

/// Frame sent to a client, discriminated by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutboundMessage {
    /// Liveness probe
    Ping,
    /// Sync reply text, or one streamed agent event payload
    PromptResponse {
        /// Opaque payload, passed through unmodified
        data: Value,
    },
    /// A streamed prompt finished normally
    PromptComplete,
    /// A prompt failed; exactly one is sent per failed prompt
    PromptError {
        /// Failure details
        data: ErrorPayload,
    },
}

impl OutboundMessage {
    /// Wrap an agent payload as a `prompt-response` frame
    #[must_use]
    pub const fn response(data: Value) -> Self {
        Self::PromptResponse { data }
    }

    /// Build a `prompt-error` frame from a bridge error
    #[must_use]
    pub fn error(error: &BridgeError) -> Self {
        Self::PromptError {
            data: ErrorPayload {
                code: error.code().to_owned(),
                message: error.to_string(),
            },
        }
    }

    /// Encode as a JSON text frame
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Serialization` if the payload cannot be encoded
    pub fn to_json(&self) -> BridgeResult<String> {
        serde_json::to_string(self).map_err(|source| BridgeError::Serialization {
            context: "outbound client frame",
            source,
        })
    }
}

/// Body of a `prompt-error` frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Stable short code (`auth`, `scope`, `session`, `message`, ...)
    pub code: String,
    /// Human-readable description
    pub message: String,
}
