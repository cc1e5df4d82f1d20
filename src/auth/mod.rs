// Authentication module
// Manages the Pinterest token lifecycle and the authorization-code bootstrap

mod exchange;
mod manager;
mod refresh;
mod types;

pub use exchange::{authorization_url, exchange_code, DEFAULT_SCOPES};
pub use manager::TokenManager;
pub use refresh::refresh_with_basic_auth;
pub use types::{
    Credentials, InitialTokens, TokenData, TokenPolicy, TokenResponse, DEFAULT_EXPIRES_IN_SECS,
};
