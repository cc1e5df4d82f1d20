// Authorization-code bootstrap

use anyhow::Context;
use chrono::Utc;
use reqwest::Url;

use super::types::{Credentials, TokenData};
use crate::error::{AuthError, Result};
use crate::http_client::{Endpoints, PinterestHttpClient};

/// Scopes requested when the caller does not name any
pub const DEFAULT_SCOPES: &[&str] = &["boards:read", "pins:read"];

/// Build the browser URL that starts the authorization-code flow
pub fn authorization_url(
    endpoints: &Endpoints,
    client_id: &str,
    redirect_uri: &str,
    scopes: &[&str],
) -> anyhow::Result<Url> {
    let scope = if scopes.is_empty() {
        DEFAULT_SCOPES.join(",")
    } else {
        scopes.join(",")
    };

    Url::parse_with_params(
        &endpoints.authorize_url(),
        &[
            ("client_id", client_id),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", scope.as_str()),
        ],
    )
    .with_context(|| format!("Invalid authorization endpoint: {}", endpoints.authorize_url()))
}

/// How client credentials are presented on one exchange attempt
#[derive(Debug, Clone, Copy, PartialEq)]
enum ExchangeAttempt {
    BasicAuth,
    FormCredentials,
    FormWithoutRedirect,
}

impl ExchangeAttempt {
    const ORDER: [ExchangeAttempt; 3] = [
        ExchangeAttempt::BasicAuth,
        ExchangeAttempt::FormCredentials,
        ExchangeAttempt::FormWithoutRedirect,
    ];

    fn needs_redirect_uri(self) -> bool {
        !matches!(self, ExchangeAttempt::FormWithoutRedirect)
    }

    fn label(self) -> &'static str {
        match self {
            ExchangeAttempt::BasicAuth => "basic_auth",
            ExchangeAttempt::FormCredentials => "form_credentials",
            ExchangeAttempt::FormWithoutRedirect => "form_without_redirect_uri",
        }
    }
}

/// Exchange an authorization code for tokens
///
/// Tries Basic auth first, then credentials in the form body, then the
/// form body without `redirect_uri`. Stops at the first success and
/// returns the last failure when every attempt is rejected.
pub async fn exchange_code(
    client: &PinterestHttpClient,
    creds: &Credentials,
    code: &str,
) -> Result<TokenData> {
    let client_id = creds
        .client_id
        .as_deref()
        .ok_or(AuthError::ConfigurationMissing("client id"))?;
    let client_secret = creds
        .client_secret
        .as_deref()
        .ok_or(AuthError::ConfigurationMissing("client secret"))?;
    let code = code.trim();
    if code.is_empty() {
        return Err(AuthError::ConfigurationMissing("authorization code"));
    }

    let mut last_error = None;

    for attempt in ExchangeAttempt::ORDER {
        let redirect_uri = creds.redirect_uri.as_deref();
        if attempt.needs_redirect_uri() && redirect_uri.is_none() {
            tracing::debug!(attempt = attempt.label(), "Skipping exchange attempt without redirect_uri");
            continue;
        }

        let mut form = vec![("grant_type", "authorization_code"), ("code", code)];
        let basic_auth = match attempt {
            ExchangeAttempt::BasicAuth => Some((client_id, client_secret)),
            _ => {
                form.push(("client_id", client_id));
                form.push(("client_secret", client_secret));
                None
            }
        };
        if attempt.needs_redirect_uri() {
            if let Some(uri) = redirect_uri {
                form.push(("redirect_uri", uri));
            }
        }

        tracing::info!(attempt = attempt.label(), "Exchanging authorization code for tokens...");

        match client.post_token_form(&form, basic_auth).await {
            Ok(response) => {
                tracing::info!(attempt = attempt.label(), "Authorization code exchanged");
                // The code is spent once accepted, so a bad expiry is final
                return TokenData::from_response(response, Utc::now());
            }
            Err(e) => {
                tracing::warn!(
                    attempt = attempt.label(),
                    error_kind = e.kind(),
                    "Token exchange attempt failed: {}",
                    e
                );
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or(AuthError::ConfigurationMissing("redirect uri")))
}
