// Token refresh logic

use chrono::Utc;

use super::types::{Credentials, TokenData};
use crate::error::{AuthError, Result};
use crate::http_client::PinterestHttpClient;

/// Refresh the access token with the refresh grant
///
/// Pinterest requires the client credentials as HTTP Basic auth here;
/// only the grant type and refresh token travel in the form body.
pub async fn refresh_with_basic_auth(
    client: &PinterestHttpClient,
    creds: &Credentials,
    refresh_token: Option<&str>,
) -> Result<TokenData> {
    let refresh_token = refresh_token.ok_or(AuthError::ConfigurationMissing("refresh token"))?;
    let client_id = creds
        .client_id
        .as_deref()
        .ok_or(AuthError::ConfigurationMissing("client id"))?;
    let client_secret = creds
        .client_secret
        .as_deref()
        .ok_or(AuthError::ConfigurationMissing("client secret"))?;

    tracing::info!("Refreshing Pinterest access token...");

    let form = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
    ];

    let response = client
        .post_token_form(&form, Some((client_id, client_secret)))
        .await?;
    let data = TokenData::from_response(response, Utc::now())?;

    tracing::info!(
        rotated = data.refresh_token.is_some(),
        "Pinterest token refreshed, expires: {}",
        data.expires_at.to_rfc3339()
    );

    Ok(data)
}
