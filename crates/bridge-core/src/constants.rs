// ABOUTME: Constants describing the external agent API and bridge defaults
// ABOUTME: OAuth scopes, endpoint paths, header names, liveness and network defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// OAuth client-credentials constants
pub mod oauth {
    /// Scopes that must all be present in a granted token
    pub const REQUIRED_SCOPES: [&str; 3] = ["sfap_api", "chatbot_api", "api"];

    /// Token endpoint path, relative to the instance URL
    pub const TOKEN_PATH: &str = "/services/oauth2/token";

    /// Grant type used for the token exchange
    pub const GRANT_TYPE: &str = "client_credentials";
}

/// Agent API paths and request constants
pub mod agent_api {
    /// Path appended to the granted API instance URL
    pub const API_BASE_PATH: &str = "/einstein/ai-agent/v1";

    /// Header carrying the session termination reason
    pub const SESSION_END_REASON_HEADER: &str = "x-session-end-reason";

    /// Termination reason sent on every session close
    pub const SESSION_END_REASON: &str = "UserRequest";

    /// Message type for text prompts
    pub const TEXT_MESSAGE_TYPE: &str = "Text";

    /// Streaming chunk types the bridge declares at session creation
    pub const STREAMING_CHUNK_TYPES: [&str; 1] = ["Text"];

    /// First sequence id issued by a session
    pub const FIRST_SEQUENCE_ID: u64 = 1;
}

/// Client connection liveness
pub mod liveness {
    /// Default probe period in seconds
    pub const DEFAULT_PING_INTERVAL_SECS: u64 = 29;
}

/// Network defaults
pub mod network {
    /// Default listen address
    pub const DEFAULT_HOST: &str = "0.0.0.0";

    /// Default listen port
    pub const DEFAULT_PORT: u16 = 5000;

    /// Default static asset directory
    pub const DEFAULT_PUBLIC_DIR: &str = "public";

    /// WebSocket upgrade route
    pub const WEBSOCKET_PATH: &str = "/websockets";

    /// Token exchange request timeout in seconds
    pub const OAUTH_TIMEOUT_SECS: u64 = 15;

    /// Connect timeout for every agent API call in seconds
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;
}

/// Service identity used in structured logs
pub mod service_names {
    /// Default service name
    pub const AGENT_BRIDGE: &str = "agent-bridge";
}
