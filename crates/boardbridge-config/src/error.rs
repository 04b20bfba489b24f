//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while resolving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Missing required field.
    #[error("missing required setting '{field}': {hint}")]
    MissingField { field: String, hint: String },

    /// A setting was present but could not be used.
    #[error("invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// No home directory and no explicit data directory.
    #[error("could not determine a data directory; set BOARDBRIDGE_HOME")]
    NoDataDir,
}

impl ConfigError {
    /// Create an invalid value error.
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}
