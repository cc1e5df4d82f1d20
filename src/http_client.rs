use anyhow::Context;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::auth::TokenResponse;
use crate::error::{AuthError, Result};
use crate::models::{BoardsPage, PinsPage, UserAccount};

pub const DEFAULT_API_BASE: &str = "https://api.pinterest.com";
pub const DEFAULT_OAUTH_BASE: &str = "https://www.pinterest.com";

/// Base URLs of the provider; overridable so tests can target a mock server
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoints {
    pub api_base: String,
    pub oauth_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            oauth_base: DEFAULT_OAUTH_BASE.to_string(),
        }
    }
}

impl Endpoints {
    /// Point both API and browser endpoints at one host
    pub fn with_base(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            api_base: base.clone(),
            oauth_base: base,
        }
    }

    pub fn token_url(&self) -> String {
        format!("{}/v5/oauth/token", self.api_base.trim_end_matches('/'))
    }

    pub fn boards_url(&self) -> String {
        format!("{}/v5/boards", self.api_base.trim_end_matches('/'))
    }

    pub fn board_pins_url(&self, board_id: &str) -> String {
        format!("{}/v5/boards/{}/pins", self.api_base.trim_end_matches('/'), board_id)
    }

    pub fn user_account_url(&self) -> String {
        format!("{}/v5/user_account", self.api_base.trim_end_matches('/'))
    }

    pub fn authorize_url(&self) -> String {
        format!("{}/oauth/", self.oauth_base.trim_end_matches('/'))
    }
}

const PIN_FIELDS: &str = "id,link,title,description,media";

/// HTTP client for the Pinterest API
pub struct PinterestHttpClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    endpoints: Endpoints,
}

impl PinterestHttpClient {
    /// Create a new HTTP client
    pub fn new(endpoints: Endpoints, connect_timeout: u64, request_timeout: u64) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout))
            .timeout(Duration::from_secs(request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, endpoints })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// POST a form to the token endpoint, optionally with Basic auth
    pub async fn post_token_form(
        &self,
        form: &[(&str, &str)],
        basic_auth: Option<(&str, &str)>,
    ) -> Result<TokenResponse> {
        let url = self.endpoints.token_url();
        let grant_type = form
            .iter()
            .find(|(key, _)| *key == "grant_type")
            .map(|(_, value)| *value)
            .unwrap_or("unknown");

        tracing::debug!(
            url = %url,
            grant_type = grant_type,
            basic_auth = basic_auth.is_some(),
            "Sending token request"
        );

        let mut request = self.client.post(&url).form(form);
        if let Some((client_id, client_secret)) = basic_auth {
            request = request.basic_auth(client_id, Some(client_secret));
        }

        let response = request.send().await.map_err(|e| {
            log_transport_error(&e, &url);
            AuthError::Transport(e)
        })?;

        let data: TokenResponse = read_json(response, &url).await?;
        if data.access_token.is_empty() {
            return Err(AuthError::MalformedResponse(
                "token response does not contain access_token".to_string(),
            ));
        }

        Ok(data)
    }

    /// GET the boards endpoint with one result and report the status
    pub async fn probe(&self, token: &str) -> Result<StatusCode> {
        let url = self.endpoints.boards_url();
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("page_size", "1")])
            .send()
            .await
            .map_err(|e| {
                log_transport_error(&e, &url);
                AuthError::Transport(e)
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "Token probe response");
        Ok(status)
    }

    /// List the first page of boards visible to the token
    pub async fn list_boards(&self, token: &str, page_size: u32) -> Result<BoardsPage> {
        let url = self.endpoints.boards_url();
        self.get_json(&url, token, &[("page_size", page_size.to_string())])
            .await
    }

    /// List the first page of pins on a board
    pub async fn list_board_pins(&self, token: &str, board_id: &str, page_size: u32) -> Result<PinsPage> {
        let url = self.endpoints.board_pins_url(board_id);
        let query = [
            ("page_size", page_size.to_string()),
            ("pin_fields", PIN_FIELDS.to_string()),
        ];
        self.get_json(&url, token, &query).await
    }

    /// Fetch the account the token belongs to
    pub async fn user_account(&self, token: &str) -> Result<UserAccount> {
        let url = self.endpoints.user_account_url();
        self.get_json(&url, token, &[]).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        token: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                log_transport_error(&e, url);
                AuthError::Transport(e)
            })?;

        read_json(response, url).await
    }
}

/// Check the status and parse a JSON body, keeping error bodies verbatim
async fn read_json<T: DeserializeOwned>(response: Response, url: &str) -> Result<T> {
    let status = response.status();
    let body = response.text().await.map_err(AuthError::Transport)?;

    if !status.is_success() {
        tracing::warn!(
            status = status.as_u16(),
            url = %url,
            response_body = %body,
            "Pinterest API returned error response"
        );

        // Pinterest errors carry {code, message}
        if let Ok(error_json) = serde_json::from_str::<serde_json::Value>(&body) {
            if let Some(message) = error_json.get("message").and_then(|v| v.as_str()) {
                tracing::warn!(
                    code = ?error_json.get("code"),
                    message = message,
                    "Pinterest error details"
                );
            }
        }

        return Err(AuthError::ProviderRejected {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        tracing::warn!(url = %url, error = %e, "Failed to parse Pinterest response");
        AuthError::MalformedResponse(e.to_string())
    })
}

fn log_transport_error(e: &reqwest::Error, url: &str) {
    let error_kind = if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connection_failed"
    } else if e.is_request() {
        "request_error"
    } else if e.is_body() {
        "body_error"
    } else if e.is_decode() {
        "decode_error"
    } else {
        "unknown"
    };

    tracing::warn!(
        error_kind = error_kind,
        error = %e,
        url = %url,
        "HTTP request error"
    );
}
