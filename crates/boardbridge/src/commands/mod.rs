//! CLI command handlers.

pub mod auth;
pub mod rate_limit;
pub mod serve;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use boardbridge_client::{BoardClient, FileRateLimitStore, RateLimiter, RetryPolicy};
use boardbridge_config::BridgeConfig;
use boardbridge_oauth::{Authenticator, FileTokenStore, OAuthConfig};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Verbose output enabled.
    pub verbose: bool,
}

/// OAuth settings for the configured Miro app.
pub fn oauth_config(config: &BridgeConfig) -> Result<OAuthConfig> {
    let client_id = config.require_client_id()?;
    Ok(OAuthConfig::miro(client_id, config.oauth.redirect_uri.as_str())
        .with_client_secret(config.oauth.client_secret.clone())
        .with_endpoints(
            config.oauth.authorize_url.as_str(),
            config.oauth.token_url.as_str(),
        )
        .with_scopes(config.oauth.scopes.clone()))
}

/// Authenticator backed by the token document in the data directory.
pub fn authenticator(config: &BridgeConfig) -> Result<Authenticator> {
    let store = FileTokenStore::shared(config.token_path());
    Ok(Authenticator::builder(oauth_config(config)?, store)
        .callback_timeout(Duration::from_secs(config.oauth.callback_timeout_secs))
        .build())
}

/// Rate limiter backed by the rate-limit document in the data directory.
pub fn rate_limiter(config: &BridgeConfig) -> Arc<RateLimiter> {
    let store = Arc::new(FileRateLimitStore::new(config.rate_limit_path()));
    Arc::new(RateLimiter::new(config.rate_limit, store))
}

/// API client wired to the given authenticator.
pub fn board_client(config: &BridgeConfig, auth: Arc<Authenticator>) -> Result<BoardClient> {
    BoardClient::builder()
        .base_url(config.api.base_url.as_str())
        .auth(auth)
        .rate_limiter(rate_limiter(config))
        .retry_policy(RetryPolicy::default().with_max_attempts(config.api.max_attempts))
        .timeout(Duration::from_secs(config.api.timeout_secs))
        .build()
        .context("Failed to build the Miro API client")
}
