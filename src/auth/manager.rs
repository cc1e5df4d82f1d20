use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::refresh;
use super::types::{Credentials, InitialTokens, TokenData, TokenPolicy, TokenState};
use crate::error::Result;
use crate::http_client::PinterestHttpClient;

/// Pinterest token manager
///
/// Hands out a usable bearer token, refreshing it when it is close to
/// expiry. Refresh failures never escape: callers get the last known
/// token instead. Share it behind an `Arc`; refreshes are serialised so
/// a single-use refresh token is never spent twice.
pub struct TokenManager {
    /// Client credentials
    credentials: Credentials,

    /// Current access/refresh token and expiry
    state: RwLock<TokenState>,

    /// Held for the whole refresh-and-update sequence
    refresh_lock: Mutex<()>,

    /// HTTP client for token and probe requests
    client: Arc<PinterestHttpClient>,

    policy: TokenPolicy,
}

impl TokenManager {
    /// Create a manager from injected configuration
    pub fn new(
        credentials: Credentials,
        initial: InitialTokens,
        policy: TokenPolicy,
        client: Arc<PinterestHttpClient>,
    ) -> Self {
        let state = TokenState::initial(initial, &policy, Utc::now());

        if let Some(exp) = state.expires_at {
            tracing::debug!("Initial access token assumed valid until {}", exp.to_rfc3339());
        }

        Self {
            credentials,
            state: RwLock::new(state),
            refresh_lock: Mutex::new(()),
            client,
            policy,
        }
    }

    /// Get a usable access token, refreshing if it is close to expiry
    ///
    /// Returns `None` only when no access token was ever available.
    pub async fn get_valid_token(&self) -> Option<String> {
        {
            let state = self.state.read().await;

            if state.refresh_token.is_none() {
                tracing::warn!("No refresh token available, using existing access token");
                return state.access_token.clone();
            }

            if state.is_fresh(self.policy.refresh_margin, Utc::now()) {
                return state.access_token.clone();
            }
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited
        {
            let state = self.state.read().await;
            if state.is_fresh(self.policy.refresh_margin, Utc::now()) {
                tracing::debug!("Token refreshed by a concurrent caller");
                return state.access_token.clone();
            }
        }

        self.refresh_locked().await
    }

    /// Force a refresh, falling back to the last known token on failure
    pub async fn refresh_access_token(&self) -> Option<String> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Force a refresh and report the typed outcome
    ///
    /// State is only updated on success.
    pub async fn try_refresh(&self) -> Result<TokenData> {
        let _guard = self.refresh_lock.lock().await;
        self.try_refresh_locked().await
    }

    /// Check whether a token is accepted by the boards endpoint
    ///
    /// Defaults to the held access token. Never fails: any error is `false`.
    pub async fn test_token(&self, token: Option<&str>) -> bool {
        let token = match token {
            Some(t) => t.to_string(),
            None => match self.access_token().await {
                Some(t) => t,
                None => return false,
            },
        };

        match self.client.probe(&token).await {
            Ok(status) => {
                if !status.is_success() {
                    tracing::warn!(status = status.as_u16(), "Token rejected by Pinterest");
                }
                status.is_success()
            }
            Err(e) => {
                tracing::warn!(error_kind = e.kind(), "Token test failed: {}", e);
                false
            }
        }
    }

    pub async fn access_token(&self) -> Option<String> {
        self.state.read().await.access_token.clone()
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.state.read().await.refresh_token.clone()
    }

    pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.expires_at
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn client(&self) -> &PinterestHttpClient {
        &self.client
    }

    /// Caller must hold `refresh_lock`
    async fn refresh_locked(&self) -> Option<String> {
        match self.try_refresh_locked().await {
            Ok(data) => Some(data.access_token),
            Err(e) => {
                tracing::error!(
                    error_kind = e.kind(),
                    "Failed to refresh Pinterest token: {}",
                    e
                );
                let token = self.access_token().await;
                if token.is_some() {
                    tracing::warn!("Using existing token despite refresh failure");
                }
                token
            }
        }
    }

    /// Caller must hold `refresh_lock`
    async fn try_refresh_locked(&self) -> Result<TokenData> {
        let refresh_token = self.refresh_token().await;
        let data =
            refresh::refresh_with_basic_auth(&self.client, &self.credentials, refresh_token.as_deref())
                .await?;

        self.state.write().await.apply(&data);
        Ok(data)
    }
}
