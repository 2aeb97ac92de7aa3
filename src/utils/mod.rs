// ABOUTME: Utility modules shared across the bridge
// ABOUTME: Currently HTTP client construction for agent API calls
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// HTTP client configuration and helpers
pub mod http_client;
