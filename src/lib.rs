// Pinterest auth - library root

pub mod auth;
pub mod config;
pub mod error;
pub mod http_client;
pub mod models;

pub use auth::TokenManager;
pub use error::AuthError;
