// ABOUTME: Environment configuration for the bridge process
// ABOUTME: Agent API credentials, listen address, static asset root, and liveness interval
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-based configuration, loaded once at process start

use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use bridge_core::constants::{liveness, network};
use tracing::info;
use url::Url;

/// Credentials and identifiers for the external agent API
#[derive(Clone)]
pub struct AgentApiConfig {
    /// Instance URL hosting the OAuth token endpoint
    pub instance_url: String,
    /// OAuth client id
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Agent the bridge opens sessions against
    pub agent_id: String,
}

impl AgentApiConfig {
    /// Load from `AGENT_INSTANCE_URL`, `AGENT_CLIENT_ID`, `AGENT_CLIENT_SECRET`, `AGENT_ID`
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable that is missing or not a valid URL
    pub fn from_env() -> Result<Self> {
        let instance_url = required_var("AGENT_INSTANCE_URL")?;
        Url::parse(&instance_url)
            .with_context(|| format!("Invalid AGENT_INSTANCE_URL value: {instance_url}"))?;

        Ok(Self {
            instance_url: instance_url.trim_end_matches('/').to_owned(),
            client_id: required_var("AGENT_CLIENT_ID")?,
            client_secret: required_var("AGENT_CLIENT_SECRET")?,
            agent_id: required_var("AGENT_ID")?,
        })
    }
}

// Keep the client secret out of logs
impl fmt::Debug for AgentApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentApiConfig")
            .field("instance_url", &self.instance_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("agent_id", &self.agent_id)
            .finish()
    }
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address
    pub host: IpAddr,
    /// Listen port
    pub http_port: u16,
    /// Directory served as static assets
    pub public_dir: PathBuf,
    /// Period between liveness probes
    pub ping_interval: Duration,
    /// Agent API settings
    pub agent: AgentApiConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value cannot be parsed
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let host = env_var_or("HOST", network::DEFAULT_HOST)
            .parse()
            .context("Invalid HOST value")?;
        let http_port = env_var_or("PORT", &network::DEFAULT_PORT.to_string())
            .parse()
            .context("Invalid PORT value")?;
        let ping_secs: u64 = env_var_or(
            "WS_PING_INTERVAL_SECS",
            &liveness::DEFAULT_PING_INTERVAL_SECS.to_string(),
        )
        .parse()
        .context("Invalid WS_PING_INTERVAL_SECS value")?;

        let config = Self {
            host,
            http_port,
            public_dir: PathBuf::from(env_var_or("PUBLIC_DIR", network::DEFAULT_PUBLIC_DIR)),
            ping_interval: Duration::from_secs(ping_secs),
            agent: AgentApiConfig::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints
    ///
    /// # Errors
    ///
    /// Returns an error if the liveness interval is zero
    pub fn validate(&self) -> Result<()> {
        if self.ping_interval.is_zero() {
            return Err(anyhow!("WS_PING_INTERVAL_SECS must be greater than zero"));
        }
        Ok(())
    }

    /// Socket address to bind
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.http_port)
    }

    /// Secret-free configuration summary for the startup log
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Agent Bridge Configuration:\n\
             - Listen: {}\n\
             - Static assets: {}\n\
             - Ping interval: {}s\n\
             - Agent instance: {}\n\
             - Agent id: {}",
            self.bind_addr(),
            self.public_dir.display(),
            self.ping_interval.as_secs(),
            self.agent.instance_url,
            self.agent.agent_id,
        )
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn required_var(key: &'static str) -> Result<String> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| anyhow!("Missing required environment variable {key}"))
}
