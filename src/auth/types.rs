// Authentication types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer};

use crate::error::AuthError;

/// Default access token lifetime when the provider omits `expires_in`
pub const DEFAULT_EXPIRES_IN_SECS: u64 = 24 * 60 * 60;

/// Registered application credentials
#[derive(Clone, Default)]
pub struct Credentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,

    /// Only needed for the authorization-code grant
    pub redirect_uri: Option<String>,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            client_secret: Some(client_secret.into()),
            redirect_uri: None,
        }
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }
}

// Keep the secret out of debug output
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// Tokens known at startup, usually from deployment configuration
#[derive(Debug, Clone, Default)]
pub struct InitialTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,

    /// Known expiry, when a previous exchange reported one
    pub expires_at: Option<DateTime<Utc>>,
}

/// Freshness policy for cached access tokens
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenPolicy {
    /// Minimum remaining validity before a cached token is reused
    pub refresh_margin: Duration,

    /// Lifetime assumed for a configured access token with unknown expiry
    pub assumed_lifetime: Duration,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            refresh_margin: Duration::hours(1),
            assumed_lifetime: Duration::hours(23),
        }
    }
}

/// Mutable token state held by the manager
#[derive(Debug, Clone, Default)]
pub(crate) struct TokenState {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenState {
    /// Build the starting state; expiry is only kept alongside an access token
    pub fn initial(tokens: InitialTokens, policy: &TokenPolicy, now: DateTime<Utc>) -> Self {
        let expires_at = tokens
            .access_token
            .as_ref()
            .map(|_| {
                tokens.expires_at.unwrap_or_else(|| {
                    now.checked_add_signed(policy.assumed_lifetime)
                        .unwrap_or(DateTime::<Utc>::MAX_UTC)
                })
            });

        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at,
        }
    }

    /// Whether the access token outlives `now + margin`
    pub fn is_fresh(&self, margin: Duration, now: DateTime<Utc>) -> bool {
        match (&self.access_token, self.expires_at) {
            (Some(_), Some(exp)) => exp - now > margin,
            _ => false,
        }
    }

    /// Apply a successful exchange or refresh
    pub fn apply(&mut self, data: &TokenData) {
        self.access_token = Some(data.access_token.clone());
        if let Some(ref refresh_token) = data.refresh_token {
            self.refresh_token = Some(refresh_token.clone());
        }
        self.expires_at = Some(data.expires_at);
    }
}

/// Token data from an exchange or refresh response
#[derive(Debug, Clone)]
pub struct TokenData {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub expires_in: u64,
    pub refresh_token_expires_in: Option<u64>,
    pub scope: Option<String>,
}

impl TokenData {
    /// Resolve `expires_in` against `now`; a zero or missing value means one day
    pub fn from_response(response: TokenResponse, now: DateTime<Utc>) -> Result<Self, AuthError> {
        let expires_in = response
            .expires_in
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS);

        let expires_at = i64::try_from(expires_in)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                AuthError::MalformedResponse(format!("expires_in out of range: {}", expires_in))
            })?;

        Ok(Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at,
            expires_in,
            refresh_token_expires_in: response.refresh_token_expires_in,
            scope: response.scope,
        })
    }
}

/// Pinterest `/v5/oauth/token` response
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub expires_in: Option<u64>,
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub refresh_token_expires_in: Option<u64>,
    pub scope: Option<String>,
}

/// Accept integer or float seconds; negative or non-numeric values count as absent
fn lenient_seconds<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;

    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f as u64)
        }),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}
