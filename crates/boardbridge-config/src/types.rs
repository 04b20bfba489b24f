//! Configuration types.
//!
//! ```toml
//! [oauth]
//! client_id = "3458764512345678901"
//! redirect_uri = "http://127.0.0.1:8899/oauth/callback"
//! callback_timeout_secs = 300
//!
//! [api]
//! base_url = "https://api.miro.com/"
//! max_attempts = 3
//!
//! [rate_limit]
//! user_requests_per_second = 10
//! app_requests_per_minute = 1000
//! ```

use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

use crate::discovery::{self, CONFIG_FILE, RATE_LIMIT_FILE, TOKEN_FILE};
use crate::error::{ConfigError, Result};

/// Default redirect URI served by the local callback listener.
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8899/oauth/callback";

/// Default authorization endpoint.
pub const DEFAULT_AUTHORIZE_URL: &str = "https://miro.com/oauth/authorize";

/// Default token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://api.miro.com/v1/oauth/token";

/// Default REST API origin.
pub const DEFAULT_API_BASE: &str = "https://api.miro.com/";

/// Scopes requested on every authorization.
pub const OAUTH_SCOPES: &[&str] = &["boards:read", "boards:write"];

// ─────────────────────────────────────────────────────────────────────────────
// File layer
// ─────────────────────────────────────────────────────────────────────────────

/// Contents of `config.toml`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub oauth: FileOAuth,
    pub api: FileApi,
    pub rate_limit: FileRateLimit,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileOAuth {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub authorize_url: Option<String>,
    pub token_url: Option<String>,
    pub callback_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileApi {
    pub base_url: Option<String>,
    pub max_attempts: Option<u32>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileRateLimit {
    pub user_requests_per_second: Option<u32>,
    pub app_requests_per_minute: Option<u32>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolved configuration
// ─────────────────────────────────────────────────────────────────────────────

/// OAuth client settings.
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    /// Application (client) identifier. Required for anything that talks to
    /// the provider.
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub authorize_url: String,
    pub token_url: String,
    /// How long to wait for the browser redirect.
    pub callback_timeout_secs: u64,
}

/// REST API settings.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    /// Network attempts per request, including the first.
    pub max_attempts: u32,
    pub timeout_secs: u64,
}

/// Client-side rate ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    pub user_requests_per_second: u32,
    pub app_requests_per_minute: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            user_requests_per_second: 10,
            app_requests_per_minute: 1000,
        }
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub data_dir: PathBuf,
    pub oauth: OAuthSettings,
    pub api: ApiSettings,
    pub rate_limit: RateLimitSettings,
}

impl BridgeConfig {
    /// Load configuration from the process environment and config file,
    /// requiring OAuth client credentials.
    pub fn load() -> Result<Self> {
        let config = Self::load_without_credentials()?;
        config.require_client_id()?;
        Ok(config)
    }

    /// Load configuration without requiring a client id.
    ///
    /// Used by commands that only touch local documents.
    pub fn load_without_credentials() -> Result<Self> {
        Self::resolve(&|key: &str| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary variable lookup.
    pub fn resolve(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = discovery::data_dir(lookup)?;
        let file = discovery::load_file_config(&data_dir.join(CONFIG_FILE))?.unwrap_or_default();
        let env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let defaults = RateLimitSettings::default();
        let rate_limit = RateLimitSettings {
            user_requests_per_second: parse_env(&env, "BOARDBRIDGE_USER_REQUESTS_PER_SECOND")?
                .or(file.rate_limit.user_requests_per_second)
                .unwrap_or(defaults.user_requests_per_second),
            app_requests_per_minute: parse_env(&env, "BOARDBRIDGE_APP_REQUESTS_PER_MINUTE")?
                .or(file.rate_limit.app_requests_per_minute)
                .unwrap_or(defaults.app_requests_per_minute),
        };
        if rate_limit.user_requests_per_second == 0 || rate_limit.app_requests_per_minute == 0 {
            return Err(ConfigError::invalid(
                "rate_limit",
                "request ceilings must be greater than zero",
            ));
        }

        let oauth = OAuthSettings {
            client_id: env("MIRO_CLIENT_ID").or(file.oauth.client_id),
            client_secret: env("MIRO_CLIENT_SECRET").or(file.oauth.client_secret),
            redirect_uri: env("MIRO_REDIRECT_URI")
                .or(file.oauth.redirect_uri)
                .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
            scopes: OAUTH_SCOPES.iter().map(|s| s.to_string()).collect(),
            authorize_url: env("MIRO_AUTHORIZE_URL")
                .or(file.oauth.authorize_url)
                .unwrap_or_else(|| DEFAULT_AUTHORIZE_URL.to_string()),
            token_url: env("MIRO_TOKEN_URL")
                .or(file.oauth.token_url)
                .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            callback_timeout_secs: parse_env(&env, "BOARDBRIDGE_CALLBACK_TIMEOUT_SECS")?
                .or(file.oauth.callback_timeout_secs)
                .unwrap_or(300),
        };

        let api = ApiSettings {
            base_url: env("MIRO_API_BASE")
                .or(file.api.base_url)
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            max_attempts: parse_env(&env, "BOARDBRIDGE_MAX_ATTEMPTS")?
                .or(file.api.max_attempts)
                .unwrap_or(3)
                .max(1),
            timeout_secs: file.api.timeout_secs.unwrap_or(30),
        };

        Ok(Self {
            data_dir,
            oauth,
            api,
            rate_limit,
        })
    }

    /// Return the client id or a helpful error.
    pub fn require_client_id(&self) -> Result<&str> {
        self.oauth
            .client_id
            .as_deref()
            .ok_or_else(|| ConfigError::MissingField {
                field: "MIRO_CLIENT_ID".to_string(),
                hint: "set it to the client id of your Miro app (or oauth.client_id in config.toml)"
                    .to_string(),
            })
    }

    /// Path of the persisted OAuth token document.
    pub fn token_path(&self) -> PathBuf {
        self.data_dir.join(TOKEN_FILE)
    }

    /// Path of the persisted rate-limit document.
    pub fn rate_limit_path(&self) -> PathBuf {
        self.data_dir.join(RATE_LIMIT_FILE)
    }

    /// Directory for rolling log files.
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

fn parse_env<T>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::invalid(key, format!("'{raw}': {e}"))),
        None => Ok(None),
    }
}
