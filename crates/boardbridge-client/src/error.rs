//! Client error types.

use boardbridge_oauth::OAuthError;
use thiserror::Error;

/// Client error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The request never produced a response (connect, timeout, reset).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A body could not be encoded or a response could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The API rejected the request.
    #[error("Miro API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message folded from the response body.
        message: String,
    },

    /// A local or remote rate ceiling was hit and waiting is not worthwhile.
    #[error("Rate limit exceeded: {message}")]
    RateLimitExceeded {
        message: String,
        /// How long the caller should wait before trying again, if known.
        retry_after_ms: Option<u64>,
    },

    /// Every attempt failed with a transient error.
    #[error("Max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },

    /// No valid access token could be obtained.
    #[error("Authentication failed: {0}")]
    Auth(#[from] OAuthError),

    /// The rate-limit document could not be read or written.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A broken internal invariant.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Api { status: 404, .. })
    }

    /// Check if this is an authentication or authorization error.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Auth(_)) || matches!(self, Error::Api { status: 401 | 403, .. })
    }

    /// Check if this is a rate limit error.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::RateLimitExceeded { .. }) || matches!(self, Error::Api { status: 429, .. })
    }

    /// Check if this is a server error.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Api { status, .. } if *status >= 500)
    }

    /// Whether repeating the same request later may succeed.
    ///
    /// Network failures, undecodable bodies and 5xx responses are transient.
    /// Authentication, rate-limit and other 4xx failures are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(_) | Error::Json(_) => true,
            Error::Api { .. } => self.is_server_error(),
            _ => false,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
