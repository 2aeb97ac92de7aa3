// ABOUTME: External agent API integration
// ABOUTME: Credentials, session handles, the HTTP client, and streamed event decoding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Agent API client
//!
//! One [`AgentSessionClient`] is shared process-wide. It owns the OAuth
//! client-credentials token and opens a fresh [`AgentSession`] per prompt.

/// Process-wide access token holder
pub mod credentials;

/// Session handle and sequence counter
pub mod session;

/// HTTP operations against the agent API
pub mod client;

/// Streamed event decoding
pub mod stream;

pub use client::AgentSessionClient;
pub use credentials::CredentialStore;
pub use session::AgentSession;
pub use stream::AgentEventStream;
