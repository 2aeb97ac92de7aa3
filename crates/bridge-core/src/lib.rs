// ABOUTME: Core types and constants for the agent bridge
// ABOUTME: Foundation crate with error handling, wire envelopes, models, and constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Bridge Core
//!
//! Foundation crate holding everything the bridge shares that does not touch the
//! network: the error taxonomy, the JSON envelopes exchanged with browser clients,
//! the credential/session models, and constants describing the external agent API.
//!
//! ## Modules
//!
//! - **errors**: `BridgeError` and `BridgeResult`
//! - **constants**: Scopes, API paths, header names, and default intervals
//! - **protocol**: `InboundMessage` / `OutboundMessage` client frames
//! - **models**: `AuthToken`, `CredentialState`, `AgentEvent`, `SyncReply`

/// Unified error taxonomy for authentication, session, message, and transport failures
pub mod errors;

/// Application constants organized by concern
pub mod constants;

/// Client-facing JSON frames
pub mod protocol;

/// Credential, session, and agent response models
pub mod models;

pub use errors::{BridgeError, BridgeResult};
pub use models::{AgentEvent, AuthToken, CredentialState, SessionState, SyncReply};
pub use protocol::{ErrorPayload, InboundMessage, OutboundMessage};
