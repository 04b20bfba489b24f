//! Error types for the OAuth flow.

use std::time::Duration;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, OAuthError>;

/// Errors that can occur while obtaining or persisting tokens.
///
/// Every variant owns plain data so the error can be cloned and handed to each
/// caller awaiting a shared authorization attempt.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OAuthError {
    /// The provider rejected the authorization or a token exchange.
    #[error("OAuth provider error '{error}': {description}")]
    Provider { error: String, description: String },

    /// The redirect callback was malformed, mismatched, or the listener failed.
    #[error("OAuth callback error: {0}")]
    Callback(String),

    /// No redirect arrived before the listener timed out.
    #[error("timed out after {}s waiting for the OAuth callback", .0.as_secs())]
    CallbackTimeout(Duration),

    /// The token document could not be read or written.
    #[error("token persistence error: {0}")]
    Persistence(String),

    /// Network/HTTP error talking to the token endpoint.
    #[error("network error: {0}")]
    Network(String),

    /// A provider response could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),
}

impl OAuthError {
    /// Create a provider error.
    pub fn provider(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Provider {
            error: error.into(),
            description: description.into(),
        }
    }

    /// Create a callback error.
    pub fn callback(msg: impl Into<String>) -> Self {
        Self::Callback(msg.into())
    }
}

impl From<reqwest::Error> for OAuthError {
    fn from(e: reqwest::Error) -> Self {
        OAuthError::Network(e.to_string())
    }
}
