// ABOUTME: Configuration module for the bridge process
// ABOUTME: Re-exports the environment-driven server and agent API settings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Environment and server configuration
pub mod environment;

pub use environment::{AgentApiConfig, ServerConfig};
