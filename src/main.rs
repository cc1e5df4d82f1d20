use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use std::sync::Arc;

use pinterest_auth::auth::{self, TokenData, TokenManager};
use pinterest_auth::config::{self, Command, Config, ENV_ACCESS_TOKEN, ENV_REFRESH_TOKEN};
use pinterest_auth::http_client::PinterestHttpClient;

/// Days until the next suggested manual refresh
const NEXT_REFRESH_DAYS: i64 = 25;

#[tokio::main]
async fn main() -> Result<()> {
    let (config, command) = Config::load()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    config.validate()?;
    tracing::debug!(api_base = %config.api_base, "Configuration loaded");

    let client = Arc::new(PinterestHttpClient::new(
        config.endpoints(),
        config.http_connect_timeout,
        config.http_request_timeout,
    )?);

    match command {
        Command::AuthorizeUrl { scopes } => print_authorize_url(&config, &client, &scopes),
        Command::Exchange { code, env_file } => run_exchange(&config, &client, code, env_file).await,
        Command::Refresh { env_file } => run_refresh(&config, client, env_file).await,
        Command::Test => run_test(&config, client).await,
    }
}

fn print_authorize_url(config: &Config, client: &PinterestHttpClient, scopes: &[String]) -> Result<()> {
    let client_id = config
        .client_id
        .as_deref()
        .context("PINTEREST_CLIENT_ID is required (use --client-id or set PINTEREST_CLIENT_ID)")?;

    let scopes: Vec<&str> = scopes.iter().map(String::as_str).collect();
    let url = auth::authorization_url(client.endpoints(), client_id, &config.redirect_uri, &scopes)?;

    println!("🔗 Step 1: Visit this URL in your browser:");
    println!("{}", url);
    println!();
    println!("📍 Step 2: After authorizing, you'll be redirected to {} with a code parameter", config.redirect_uri);
    println!("📋 Step 3: Run: pinterest-auth exchange <CODE>");
    Ok(())
}

async fn run_exchange(
    config: &Config,
    client: &PinterestHttpClient,
    code: Option<String>,
    env_file: Option<String>,
) -> Result<()> {
    let code = match code {
        Some(code) => code,
        None => dialoguer::Input::<String>::new()
            .with_prompt("Authorization code from the redirect URL")
            .interact_text()
            .context("Failed to read authorization code")?,
    };

    let creds = config.credentials();
    let tokens = auth::exchange_code(client, &creds, &code)
        .await
        .context("Token exchange failed with every request format")?;

    println!("✅ SUCCESS! Tokens received");
    println!("Access Token:  {}", preview(&tokens.access_token));
    if let Some(ref refresh_token) = tokens.refresh_token {
        println!("Refresh Token: {}", preview(refresh_token));
    }
    println!("Expires in:    {} seconds", tokens.expires_in);

    let refresh_token = tokens.refresh_token.clone().unwrap_or_default();
    emit_tokens(&tokens, &refresh_token, env_file.as_deref())
}

async fn run_refresh(
    config: &Config,
    client: Arc<PinterestHttpClient>,
    env_file: Option<String>,
) -> Result<()> {
    let client_id = config
        .client_id
        .as_deref()
        .context("PINTEREST_CLIENT_ID is required")?;
    config
        .client_secret
        .as_deref()
        .context("PINTEREST_CLIENT_SECRET is required")?;
    let old_refresh_token = config
        .refresh_token
        .clone()
        .context("PINTEREST_REFRESH_TOKEN is required")?;

    tracing::info!(client_id = client_id, "All credentials found");
    println!("Refresh token: {}", preview(&old_refresh_token));

    let manager = TokenManager::new(
        config.credentials(),
        config.initial_tokens(),
        config.token_policy(),
        client,
    );

    let tokens = manager.try_refresh().await.context("Token refresh failed")?;

    println!();
    println!("✅ SUCCESS! Pinterest tokens refreshed");
    println!("Access token expires in: {} days", days(tokens.expires_in));
    if let Some(secs) = tokens.refresh_token_expires_in {
        println!("Refresh token expires in: {} days", days(secs));
    }
    println!(
        "Token scopes: {}",
        tokens.scope.as_deref().unwrap_or("boards:read,pins:read")
    );

    let refresh_token = manager.refresh_token().await.unwrap_or(old_refresh_token);
    emit_tokens(&tokens, &refresh_token, env_file.as_deref())?;

    let next_refresh = Utc::now() + Duration::days(NEXT_REFRESH_DAYS);
    println!();
    println!("⏰ Next refresh needed: {}", next_refresh.format("%a %b %d %Y"));

    println!();
    println!("🧪 Testing new access token...");
    match manager.client().list_boards(&tokens.access_token, 1).await {
        Ok(page) => println!("✅ New token works! Found {} boards", page.items.len()),
        Err(e) => println!("⚠️  Token test failed: {}", e),
    }

    Ok(())
}

async fn run_test(config: &Config, client: Arc<PinterestHttpClient>) -> Result<()> {
    let manager = TokenManager::new(
        config.credentials(),
        config.initial_tokens(),
        config.token_policy(),
        client,
    );

    let token = manager
        .access_token()
        .await
        .context("PINTEREST_ACCESS_TOKEN is required")?;

    println!("🧪 Testing access token with boards endpoint...");
    if !manager.test_token(None).await {
        anyhow::bail!("Access token was rejected by Pinterest");
    }

    let first_board = match manager.client().list_boards(&token, 5).await {
        Ok(page) => {
            println!("✅ Access token is valid for boards endpoint");
            println!("Found {} boards", page.items.len());
            for (index, board) in page.items.iter().enumerate() {
                println!("   {}. \"{}\" (ID: {})", index + 1, board.name, board.id);
            }
            page.items.into_iter().next()
        }
        Err(e) => {
            println!("❌ Boards endpoint failed: {}", e);
            None
        }
    };

    if let Some(board) = first_board {
        println!();
        println!("🧪 Testing pins endpoint with board \"{}\"...", board.name);
        match manager.client().list_board_pins(&token, &board.id, 3).await {
            Ok(page) => {
                println!("✅ Found {} pins in board", page.items.len());
                for (index, pin) in page.items.iter().enumerate() {
                    println!("   {}. \"{}\" (ID: {})", index + 1, pin.display_title(), pin.id);
                }
            }
            Err(e) => println!("❌ Pins endpoint failed: {}", e),
        }
    }

    println!();
    println!("🧪 Testing user account endpoint...");
    match manager.client().user_account(&token).await {
        Ok(account) => println!(
            "✅ Account: {} ({})",
            account.username.as_deref().unwrap_or("unknown"),
            account.account_type.as_deref().unwrap_or("unknown type")
        ),
        Err(e) => println!("⚠️  User account endpoint failed: {}", e),
    }

    Ok(())
}

/// Print env lines and optionally merge them into an env file
fn emit_tokens(tokens: &TokenData, refresh_token: &str, env_file: Option<&str>) -> Result<()> {
    println!();
    println!("📝 NEW TOKENS:");
    println!("{}", "=".repeat(50));
    println!("{}={}", ENV_ACCESS_TOKEN, tokens.access_token);
    if !refresh_token.is_empty() {
        println!("{}={}", ENV_REFRESH_TOKEN, refresh_token);
    }
    println!("{}", "=".repeat(50));

    if let Some(path) = env_file {
        let path = config::expand_tilde(path);
        let mut updates = vec![(ENV_ACCESS_TOKEN, tokens.access_token.as_str())];
        if !refresh_token.is_empty() {
            updates.push((ENV_REFRESH_TOKEN, refresh_token));
        }
        config::save_tokens_to_env_file(&path, &updates)?;
        println!("✅ Tokens saved to {}", path.display());
    } else {
        println!("Copy these into your deployment environment variables.");
    }

    Ok(())
}

fn preview(token: &str) -> String {
    let head: String = token.chars().take(20).collect();
    format!("{}...", head)
}

fn days(secs: u64) -> u64 {
    (secs + 43_200) / 86_400
}
