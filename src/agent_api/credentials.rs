// ABOUTME: Client-credentials token holder shared by every agent session
// ABOUTME: Exchanges client id/secret for a bearer token, checks scopes, supports invalidation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bridge_core::constants::oauth::{GRANT_TYPE, REQUIRED_SCOPES, TOKEN_PATH};
use bridge_core::{AuthToken, BridgeError, BridgeResult, CredentialState};
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::AgentApiConfig;
use crate::utils::http_client;

/// Token endpoint response body
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    scope: String,
    api_instance_url: String,
}

enum TokenSlot {
    Unauthenticated,
    Authenticating,
    Authenticated(Arc<AuthToken>),
}

/// Holds the single process-wide access token
///
/// Concurrent callers that find no token each run their own exchange; whichever
/// completes last is the token that stays cached.
pub struct CredentialStore {
    config: AgentApiConfig,
    http: Client,
    slot: RwLock<TokenSlot>,
    exchanges: AtomicU64,
}

impl CredentialStore {
    /// Create an unauthenticated store
    #[must_use]
    pub fn new(config: AgentApiConfig) -> Self {
        Self {
            config,
            http: http_client::oauth_client(),
            slot: RwLock::new(TokenSlot::Unauthenticated),
            exchanges: AtomicU64::new(0),
        }
    }

    /// Current credential state
    pub async fn state(&self) -> CredentialState {
        match *self.slot.read().await {
            TokenSlot::Unauthenticated => CredentialState::Unauthenticated,
            TokenSlot::Authenticating => CredentialState::Authenticating,
            TokenSlot::Authenticated(_) => CredentialState::Authenticated,
        }
    }

    /// Number of successful token exchanges since start
    pub fn exchange_count(&self) -> u64 {
        self.exchanges.load(Ordering::Relaxed)
    }

    /// Cached token, authenticating first if there is none
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Auth` or `BridgeError::Scope` if an exchange is needed and fails
    pub async fn token(&self) -> BridgeResult<Arc<AuthToken>> {
        if let TokenSlot::Authenticated(token) = &*self.slot.read().await {
            return Ok(Arc::clone(token));
        }
        self.authenticate().await
    }

    /// Run the client-credentials exchange and cache the result
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Auth` when the token endpoint fails or is unreachable and
    /// `BridgeError::Scope` when the granted scopes lack a required one. Either way no
    /// token is cached afterwards.
    pub async fn authenticate(&self) -> BridgeResult<Arc<AuthToken>> {
        {
            let mut slot = self.slot.write().await;
            if !matches!(*slot, TokenSlot::Authenticated(_)) {
                *slot = TokenSlot::Authenticating;
            }
        }

        match self.exchange().await {
            Ok(token) => {
                let token = Arc::new(token);
                *self.slot.write().await = TokenSlot::Authenticated(Arc::clone(&token));
                self.exchanges.fetch_add(1, Ordering::Relaxed);
                info!(
                    api_instance_url = %token.api_instance_url,
                    "Agent API authentication succeeded"
                );
                Ok(token)
            }
            Err(e) => {
                let mut slot = self.slot.write().await;
                if matches!(*slot, TokenSlot::Authenticating) {
                    *slot = TokenSlot::Unauthenticated;
                }
                error!(error = %e, "Agent API authentication failed");
                Err(e)
            }
        }
    }

    /// Drop the cached token if it is still the one that was rejected
    ///
    /// A token another task obtained in the meantime is left in place.
    pub async fn invalidate(&self, rejected: &AuthToken) {
        let mut slot = self.slot.write().await;
        if let TokenSlot::Authenticated(current) = &*slot {
            if current.access_token == rejected.access_token {
                *slot = TokenSlot::Unauthenticated;
                warn!("Cached agent API token invalidated");
            } else {
                debug!("Rejected token already replaced, keeping current token");
            }
        }
    }

    async fn exchange(&self) -> BridgeResult<AuthToken> {
        let url = format!("{}{TOKEN_PATH}", self.config.instance_url);
        let params = [
            ("grant_type", GRANT_TYPE),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| BridgeError::auth(None, format!("Token endpoint unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::auth(
                Some(status.as_u16()),
                format!("Token request rejected: {body}"),
            ));
        }

        let body: TokenResponse = response.json().await.map_err(|e| {
            BridgeError::auth(
                Some(status.as_u16()),
                format!("Invalid token response: {e}"),
            )
        })?;

        let scopes: HashSet<String> = body.scope.split_whitespace().map(str::to_owned).collect();
        check_scopes(&scopes)?;

        Ok(AuthToken {
            access_token: body.access_token,
            api_instance_url: body.api_instance_url,
            scopes,
            obtained_at: Utc::now(),
        })
    }
}

/// Every required scope must be granted; extra scopes are fine
fn check_scopes(granted: &HashSet<String>) -> BridgeResult<()> {
    if REQUIRED_SCOPES.iter().all(|scope| granted.contains(*scope)) {
        return Ok(());
    }

    let mut granted: Vec<String> = granted.iter().cloned().collect();
    granted.sort();
    Err(BridgeError::Scope {
        required: REQUIRED_SCOPES.iter().map(|s| (*s).to_owned()).collect(),
        granted,
    })
}
