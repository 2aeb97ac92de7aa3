// ABOUTME: HTTP client construction for agent API calls
// ABOUTME: Separate OAuth and API clients; API client has no request timeout so SSE streams survive
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::time::Duration;

use bridge_core::constants::network::{CONNECT_TIMEOUT_SECS, OAUTH_TIMEOUT_SECS};
use reqwest::{Client, ClientBuilder};

/// Create a new HTTP client with custom configuration
///
/// Falls back to a default client if the builder fails
pub fn create_custom_client<F>(config_fn: F) -> Client
where
    F: FnOnce(ClientBuilder) -> ClientBuilder,
{
    config_fn(ClientBuilder::new())
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Client for the token exchange, which should always be fast
#[must_use]
pub fn oauth_client() -> Client {
    create_custom_client(|builder| {
        builder
            .timeout(Duration::from_secs(OAUTH_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
    })
}

/// Client for session and message calls
///
/// Only the connect phase is bounded: streaming responses stay open for as long
/// as the agent keeps emitting events.
#[must_use]
pub fn api_client() -> Client {
    create_custom_client(|builder| {
        builder.connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
    })
}
