use anyhow::{Context, Result};
use chrono::Duration;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::auth::{Credentials, InitialTokens, TokenPolicy};
use crate::http_client::{Endpoints, DEFAULT_API_BASE, DEFAULT_OAUTH_BASE};

pub const DEFAULT_REDIRECT_URI: &str = "https://localhost:3000/callback";

/// Upper bound for policy durations (ten years)
pub const MAX_POLICY_SECS: u64 = 10 * 365 * 24 * 60 * 60;

pub const ENV_ACCESS_TOKEN: &str = "PINTEREST_ACCESS_TOKEN";
pub const ENV_REFRESH_TOKEN: &str = "PINTEREST_REFRESH_TOKEN";

/// Pinterest token helper for the blog
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Pinterest app client id
    #[arg(long, env = "PINTEREST_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Pinterest app client secret
    #[arg(long, env = "PINTEREST_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Current access token
    #[arg(long, env = ENV_ACCESS_TOKEN, hide_env_values = true)]
    pub access_token: Option<String>,

    /// Current refresh token
    #[arg(long, env = ENV_REFRESH_TOKEN, hide_env_values = true)]
    pub refresh_token: Option<String>,

    /// Redirect URI registered with the app
    #[arg(long, env = "PINTEREST_REDIRECT_URI", default_value = DEFAULT_REDIRECT_URI)]
    pub redirect_uri: String,

    /// Pinterest API base URL
    #[arg(long, env = "PINTEREST_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Pinterest web base URL (authorization page)
    #[arg(long, env = "PINTEREST_OAUTH_BASE", default_value = DEFAULT_OAUTH_BASE)]
    pub oauth_base: String,

    /// Refresh when less than this many seconds of validity remain
    #[arg(long, env = "TOKEN_REFRESH_MARGIN", default_value = "3600")]
    pub refresh_margin: u64,

    /// Lifetime in seconds assumed for a configured token with unknown expiry
    #[arg(long, env = "TOKEN_ASSUMED_LIFETIME", default_value = "82800")]
    pub assumed_lifetime: u64,

    /// HTTP connect timeout in seconds
    #[arg(long, env = "HTTP_CONNECT_TIMEOUT", default_value = "10")]
    pub connect_timeout: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "30")]
    pub http_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print the browser URL that starts the authorization flow
    AuthorizeUrl {
        /// Requested scope (repeatable)
        #[arg(long = "scope")]
        scopes: Vec<String>,
    },

    /// Exchange an authorization code for tokens
    Exchange {
        /// Code from the redirect; prompted for when omitted
        code: Option<String>,

        /// Write the new tokens into this env file
        #[arg(long)]
        env_file: Option<String>,
    },

    /// Refresh the access token with the configured refresh token
    Refresh {
        /// Write the new tokens into this env file
        #[arg(long)]
        env_file: Option<String>,
    },

    /// Check the configured access token against the API
    Test,
}

#[derive(Clone, Debug)]
pub struct Config {
    // Pinterest credentials
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: String,

    // Tokens
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,

    // Endpoints
    pub api_base: String,
    pub oauth_base: String,

    // Token policy (seconds)
    pub refresh_margin: u64,
    pub assumed_lifetime: u64,

    // HTTP client
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    pub log_level: String,
}

impl Config {
    /// Load configuration with priority: CLI > ENV (.env included) > defaults
    pub fn load() -> Result<(Self, Command)> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        Ok(Self::from_args(args))
    }

    pub fn from_args(args: CliArgs) -> (Self, Command) {
        let config = Config {
            client_id: non_empty(args.client_id),
            client_secret: non_empty(args.client_secret),
            redirect_uri: args.redirect_uri,
            access_token: non_empty(args.access_token),
            refresh_token: non_empty(args.refresh_token),
            api_base: args.api_base,
            oauth_base: args.oauth_base,
            refresh_margin: args.refresh_margin,
            assumed_lifetime: args.assumed_lifetime,
            http_connect_timeout: args.connect_timeout,
            http_request_timeout: args.http_timeout,
            log_level: args.log_level,
        };

        (config, args.command)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for base in [&self.api_base, &self.oauth_base] {
            if !(base.starts_with("http://") || base.starts_with("https://")) {
                anyhow::bail!("Base URL must start with http:// or https://: {}", base);
            }
        }

        if self.http_request_timeout == 0 || self.http_connect_timeout == 0 {
            anyhow::bail!("HTTP timeouts must be greater than zero");
        }

        if self.refresh_margin > MAX_POLICY_SECS || self.assumed_lifetime > MAX_POLICY_SECS {
            anyhow::bail!(
                "Refresh margin and assumed lifetime must not exceed {} seconds",
                MAX_POLICY_SECS
            );
        }

        if self.refresh_margin >= self.assumed_lifetime {
            tracing::warn!(
                refresh_margin = self.refresh_margin,
                assumed_lifetime = self.assumed_lifetime,
                "Refresh margin exceeds assumed token lifetime; configured tokens will refresh on first use"
            );
        }

        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            redirect_uri: Some(self.redirect_uri.clone()),
        }
    }

    pub fn initial_tokens(&self) -> InitialTokens {
        InitialTokens {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            expires_at: None,
        }
    }

    pub fn token_policy(&self) -> TokenPolicy {
        TokenPolicy {
            refresh_margin: policy_duration(self.refresh_margin),
            assumed_lifetime: policy_duration(self.assumed_lifetime),
        }
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            api_base: self.api_base.clone(),
            oauth_base: self.oauth_base.clone(),
        }
    }
}

fn policy_duration(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_POLICY_SECS) as i64)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Expand tilde (~) in file paths to user's home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

// === Env file updates ===

/// Replace or append `KEY=value` lines, leaving every other line untouched
pub fn merge_env_content(existing: &str, updates: &[(&str, &str)]) -> String {
    let mut written = vec![false; updates.len()];
    let mut lines: Vec<String> = Vec::new();

    for line in existing.lines() {
        let key = line
            .split_once('=')
            .map(|(k, _)| k.trim().trim_start_matches("export ").trim());

        match key.and_then(|k| updates.iter().position(|(u, _)| *u == k)) {
            Some(idx) if !line.trim_start().starts_with('#') => {
                if !written[idx] {
                    lines.push(format!("{}={}", updates[idx].0, updates[idx].1));
                    written[idx] = true;
                }
            }
            _ => lines.push(line.to_string()),
        }
    }

    for (idx, (key, value)) in updates.iter().enumerate() {
        if !written[idx] {
            lines.push(format!("{}={}", key, value));
        }
    }

    let mut content = lines.join("\n");
    content.push('\n');
    content
}

/// Merge token values into an env file, creating it if needed
pub fn save_tokens_to_env_file(path: &Path, updates: &[(&str, &str)]) -> Result<()> {
    let existing = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read env file: {}", path.display()))
        }
    };

    let content = merge_env_content(&existing, updates);

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create env file: {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write env file: {}", path.display()))?;

    tracing::info!(path = %path.display(), keys = updates.len(), "Updated env file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn parse(args: &[&str]) -> (Config, Command) {
        let mut argv = vec!["pinterest-auth"];
        argv.extend_from_slice(args);
        Config::from_args(CliArgs::try_parse_from(argv).unwrap())
    }

    #[test]
    fn test_expand_tilde() {
        let path = expand_tilde("~/blog/.env");
        assert!(path.to_string_lossy().contains("blog/.env"));
        assert!(!path.to_string_lossy().starts_with("~"));

        let path = expand_tilde("/absolute/.env");
        assert_eq!(path, PathBuf::from("/absolute/.env"));
    }

    #[test]
    fn test_expand_tilde_just_tilde() {
        let path = expand_tilde("~");
        assert_eq!(path, PathBuf::from("~"));
    }

    #[test]
    fn test_cli_values_and_subcommand() {
        let (config, command) = parse(&[
            "--client-id",
            "1526279",
            "--client-secret",
            "secret",
            "--refresh-margin",
            "600",
            "exchange",
            "CODE",
            "--env-file",
            ".env",
        ]);

        assert_eq!(config.client_id.as_deref(), Some("1526279"));
        assert_eq!(config.refresh_margin, 600);
        assert_eq!(
            command,
            Command::Exchange {
                code: Some("CODE".to_string()),
                env_file: Some(".env".to_string()),
            }
        );
    }

    #[test]
    fn test_authorize_url_scopes() {
        let (_, command) = parse(&[
            "authorize-url",
            "--scope",
            "boards:read",
            "--scope",
            "pins:read",
        ]);

        assert_eq!(
            command,
            Command::AuthorizeUrl {
                scopes: vec!["boards:read".to_string(), "pins:read".to_string()]
            }
        );
    }

    #[test]
    fn test_empty_values_are_absent() {
        let (config, _) = parse(&["--access-token", "", "--refresh-token", "  ", "test"]);
        assert!(config.access_token.is_none());
        assert!(config.refresh_token.is_none());
    }

    #[test]
    fn test_conversions() {
        let (config, _) = parse(&[
            "--client-id",
            "id",
            "--client-secret",
            "secret",
            "--access-token",
            "A1",
            "--api-base",
            "http://127.0.0.1:8080",
            "--refresh-margin",
            "60",
            "--assumed-lifetime",
            "120",
            "refresh",
        ]);

        let creds = config.credentials();
        assert_eq!(creds.client_id.as_deref(), Some("id"));
        assert_eq!(creds.redirect_uri.as_deref(), Some(DEFAULT_REDIRECT_URI));

        let tokens = config.initial_tokens();
        assert_eq!(tokens.access_token.as_deref(), Some("A1"));
        assert!(tokens.refresh_token.is_none());

        let policy = config.token_policy();
        assert_eq!(policy.refresh_margin, Duration::seconds(60));
        assert_eq!(policy.assumed_lifetime, Duration::seconds(120));

        assert_eq!(
            config.endpoints().token_url(),
            "http://127.0.0.1:8080/v5/oauth/token"
        );
    }

    #[test]
    fn test_validate() {
        let (config, _) = parse(&["test"]);
        assert!(config.validate().is_ok());

        let (config, _) = parse(&["--api-base", "api.pinterest.com", "test"]);
        assert!(config.validate().is_err());

        let (config, _) = parse(&["--http-timeout", "0", "test"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_huge_policy_values() {
        let (config, _) = parse(&["--assumed-lifetime", "10000000000000000", "test"]);
        assert!(config.validate().is_err());

        let (config, _) = parse(&["--refresh-margin", "18446744073709551615", "test"]);
        assert!(config.validate().is_err());

        // Conversion clamps instead of panicking
        let policy = config.token_policy();
        assert_eq!(policy.refresh_margin, Duration::seconds(MAX_POLICY_SECS as i64));
    }

    #[test]
    fn test_merge_env_replaces_in_place() {
        let existing = "# Pinterest\nPINTEREST_CLIENT_ID=1526279\nPINTEREST_ACCESS_TOKEN=old\nSITE=blog\n";
        let merged = merge_env_content(
            existing,
            &[(ENV_ACCESS_TOKEN, "new"), (ENV_REFRESH_TOKEN, "R2")],
        );

        assert_eq!(
            merged,
            "# Pinterest\nPINTEREST_CLIENT_ID=1526279\nPINTEREST_ACCESS_TOKEN=new\nSITE=blog\nPINTEREST_REFRESH_TOKEN=R2\n"
        );
    }

    #[test]
    fn test_merge_env_ignores_comments_and_duplicates() {
        let existing = "#PINTEREST_ACCESS_TOKEN=commented\nexport PINTEREST_ACCESS_TOKEN=a\nPINTEREST_ACCESS_TOKEN=b\n";
        let merged = merge_env_content(existing, &[(ENV_ACCESS_TOKEN, "c")]);

        assert_eq!(merged, "#PINTEREST_ACCESS_TOKEN=commented\nPINTEREST_ACCESS_TOKEN=c\n");
    }

    #[test]
    fn test_merge_env_empty_file() {
        let merged = merge_env_content("", &[(ENV_ACCESS_TOKEN, "A1")]);
        assert_eq!(merged, "PINTEREST_ACCESS_TOKEN=A1\n");
    }

    proptest! {
        #[test]
        fn prop_merge_env_keeps_unrelated_lines(
            lines in prop::collection::vec("[A-Z_]{1,12}=[a-z0-9]{0,8}", 0..8),
            token in "[A-Za-z0-9_-]{1,40}",
        ) {
            let existing = lines.join("\n");
            let merged = merge_env_content(&existing, &[(ENV_ACCESS_TOKEN, token.as_str())]);

            let expected_line = format!("{}={}", ENV_ACCESS_TOKEN, token);
            prop_assert_eq!(merged.lines().filter(|l| *l == expected_line).count(), 1);
            for line in lines.iter().filter(|l| !l.starts_with("PINTEREST_ACCESS_TOKEN=")) {
                prop_assert!(merged.lines().any(|l| l == line.as_str()));
            }
        }

        #[test]
        fn prop_merge_env_is_idempotent(
            lines in prop::collection::vec("[A-Z_]{1,12}=[a-z0-9]{0,8}", 0..8),
            token in "[A-Za-z0-9_-]{1,40}",
        ) {
            let updates = [(ENV_ACCESS_TOKEN, token.as_str())];
            let once = merge_env_content(&lines.join("\n"), &updates);
            let twice = merge_env_content(&once, &updates);
            prop_assert_eq!(once, twice);
        }
    }
}
