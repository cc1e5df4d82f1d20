// Error handling module
// Defines the failure taxonomy for token operations

use thiserror::Error;

/// Errors that can occur while talking to the Pinterest OAuth endpoints
#[derive(Error, Debug)]
pub enum AuthError {
    /// A required credential or token was absent before any request was made
    #[error("Missing configuration: {0}")]
    ConfigurationMissing(&'static str),

    /// Network-level failure reaching the provider
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Provider answered with a non-2xx status
    #[error("Pinterest API error: {status} - {body}")]
    ProviderRejected { status: u16, body: String },

    /// 2xx response whose body is not the expected JSON
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl AuthError {
    /// HTTP status returned by the provider, if the request got that far
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthError::ProviderRejected { status, .. } => Some(*status),
            AuthError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Short label used in structured log records
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::ConfigurationMissing(_) => "configuration_missing",
            AuthError::Transport(e) if e.is_timeout() => "timeout",
            AuthError::Transport(e) if e.is_connect() => "connection_failed",
            AuthError::Transport(_) => "transport",
            AuthError::ProviderRejected { .. } => "provider_rejected",
            AuthError::MalformedResponse(_) => "malformed_response",
        }
    }
}

/// Result type alias for token operations
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AuthError::ConfigurationMissing("refresh token");
        assert_eq!(err.to_string(), "Missing configuration: refresh token");

        let err = AuthError::ProviderRejected {
            status: 401,
            body: "{\"code\":2,\"message\":\"Authentication failed.\"}".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Pinterest API error: 401 - {\"code\":2,\"message\":\"Authentication failed.\"}"
        );

        let err = AuthError::MalformedResponse("expected value at line 1".to_string());
        assert_eq!(err.to_string(), "Malformed response: expected value at line 1");
    }

    #[test]
    fn test_status_extraction() {
        let err = AuthError::ProviderRejected {
            status: 400,
            body: String::new(),
        };
        assert_eq!(err.status(), Some(400));

        assert_eq!(AuthError::ConfigurationMissing("client id").status(), None);
        assert_eq!(AuthError::MalformedResponse("x".into()).status(), None);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            AuthError::ConfigurationMissing("client secret").kind(),
            "configuration_missing"
        );
        assert_eq!(
            AuthError::ProviderRejected {
                status: 500,
                body: String::new()
            }
            .kind(),
            "provider_rejected"
        );
        assert_eq!(
            AuthError::MalformedResponse(String::new()).kind(),
            "malformed_response"
        );
    }
}
