//! The authorization state machine behind "give me a valid access token".
//!
//! ```text
//! NoToken -> Authorizing -> Exchanging -> Authorized -> Refreshing -> Authorized
//!                                             |
//!                                   clear_tokens() -> NoToken
//! ```
//!
//! Only one authorization or refresh attempt runs per [`Authenticator`] at a
//! time. Concurrent callers share the in-flight attempt and all observe its
//! result.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;

use crate::callback::CallbackListener;
use crate::error::{OAuthError, Result};
use crate::oauth::{
    OAuthConfig, OAuthTokens, PkceChallenge, build_authorization_url, exchange_code_for_tokens,
    generate_state, now_millis, refresh_access_token,
};
use crate::token_store::{SharedTokenStore, TokenInfo};

/// Tokens are treated as expired this long before `expires_at`.
pub const DEFAULT_EXPIRY_SKEW: Duration = Duration::from_secs(60);

/// Default wait for the browser redirect.
const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Opens the authorization URL for the user.
pub trait UrlOpener: Send + Sync + std::fmt::Debug {
    fn open(&self, url: &str) -> std::io::Result<()>;
}

/// Opens URLs with the platform's default handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl UrlOpener for SystemBrowser {
    fn open(&self, url: &str) -> std::io::Result<()> {
        open::that(url)
    }
}

/// Observable authorization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    NoToken,
    Authorizing,
    Exchanging,
    Authorized,
    Refreshing,
}

type InFlight = Shared<BoxFuture<'static, Result<String>>>;

struct Inner {
    config: OAuthConfig,
    store: SharedTokenStore,
    http: reqwest::Client,
    opener: Arc<dyn UrlOpener>,
    callback_timeout: Duration,
    expiry_skew: Duration,
    state: Mutex<AuthState>,
    /// The running attempt and whether it was forced.
    in_flight: Mutex<Option<(bool, InFlight)>>,
}

/// Obtains, refreshes and persists OAuth tokens.
#[derive(Clone)]
pub struct Authenticator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("client_id", &self.inner.config.client_id)
            .field("redirect_uri", &self.inner.config.redirect_uri)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Authenticator`].
pub struct AuthenticatorBuilder {
    config: OAuthConfig,
    store: SharedTokenStore,
    http: Option<reqwest::Client>,
    opener: Arc<dyn UrlOpener>,
    callback_timeout: Duration,
    expiry_skew: Duration,
}

impl AuthenticatorBuilder {
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn opener(mut self, opener: Arc<dyn UrlOpener>) -> Self {
        self.opener = opener;
        self
    }

    pub fn callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = timeout;
        self
    }

    pub fn expiry_skew(mut self, skew: Duration) -> Self {
        self.expiry_skew = skew;
        self
    }

    pub fn build(self) -> Authenticator {
        Authenticator {
            inner: Arc::new(Inner {
                config: self.config,
                store: self.store,
                http: self.http.unwrap_or_default(),
                opener: self.opener,
                callback_timeout: self.callback_timeout,
                expiry_skew: self.expiry_skew,
                state: Mutex::new(AuthState::NoToken),
                in_flight: Mutex::new(None),
            }),
        }
    }
}

impl Authenticator {
    /// Create an authenticator with the system browser and default timeouts.
    pub fn new(config: OAuthConfig, store: SharedTokenStore) -> Self {
        Self::builder(config, store).build()
    }

    pub fn builder(config: OAuthConfig, store: SharedTokenStore) -> AuthenticatorBuilder {
        AuthenticatorBuilder {
            config,
            store,
            http: None,
            opener: Arc::new(SystemBrowser),
            callback_timeout: DEFAULT_CALLBACK_TIMEOUT,
            expiry_skew: DEFAULT_EXPIRY_SKEW,
        }
    }

    /// Current state of the machine.
    pub fn state(&self) -> AuthState {
        *self.inner.state.lock()
    }

    /// Return a currently valid access token.
    ///
    /// Uses the stored token when it has not expired, otherwise refreshes it,
    /// otherwise runs the full browser authorization.
    pub async fn access_token(&self) -> Result<String> {
        if let Some(tokens) = self.inner.load_tokens().await
            && !self.inner.is_expired(&tokens)
        {
            self.inner.set_state(AuthState::Authorized);
            return Ok(tokens.access_token);
        }
        self.single_flight(false).await
    }

    /// Run a full authorization even if valid tokens exist.
    ///
    /// An in-flight non-forced attempt is waited out, never joined, so the
    /// result always comes from a fresh browser authorization.
    pub async fn login(&self) -> Result<String> {
        self.single_flight(true).await
    }

    /// Delete stored tokens. Succeeds when nothing is stored.
    pub async fn clear_tokens(&self) -> Result<()> {
        self.inner.store.delete().await?;
        self.inner.set_state(AuthState::NoToken);
        tracing::info!("OAuth tokens cleared");
        Ok(())
    }

    /// Expiry information about the stored tokens.
    pub async fn token_info(&self) -> Result<Option<TokenInfo>> {
        let skew_ms = self.inner.expiry_skew.as_millis() as u64;
        Ok(self
            .inner
            .store
            .load()
            .await?
            .map(|tokens| TokenInfo::from_tokens(&tokens, now_millis(), skew_ms)))
    }

    /// Join the in-flight attempt or start a new one.
    async fn single_flight(&self, force: bool) -> Result<String> {
        loop {
            let (running, attempt) = {
                let mut slot = self.inner.in_flight.lock();
                match slot.as_ref() {
                    Some((forced, attempt)) => (Some(*forced), attempt.clone()),
                    None => {
                        let inner = Arc::clone(&self.inner);
                        let task = tokio::spawn(async move {
                            let _clear = ClearInFlight(Arc::clone(&inner));
                            inner.acquire(force).await
                        });
                        let attempt = async move {
                            task.await.unwrap_or_else(|e| {
                                Err(OAuthError::Callback(format!(
                                    "authorization task failed: {e}"
                                )))
                            })
                        }
                        .boxed()
                        .shared();
                        *slot = Some((force, attempt.clone()));
                        (None, attempt)
                    }
                }
            };

            match running {
                // The slot is empty again once the awaited attempt resolves.
                Some(false) if force => {
                    tracing::debug!("Waiting out in-flight authorization before forced login");
                    let _ = attempt.await;
                }
                Some(_) => {
                    tracing::debug!("Joining in-flight authorization");
                    return attempt.await;
                }
                None => return attempt.await,
            }
        }
    }
}

/// Empties the in-flight slot when the attempt ends, however it ends.
struct ClearInFlight(Arc<Inner>);

impl Drop for ClearInFlight {
    fn drop(&mut self) {
        self.0.in_flight.lock().take();
    }
}

impl Inner {
    fn set_state(&self, next: AuthState) {
        let mut state = self.state.lock();
        if *state != next {
            tracing::debug!(from = ?*state, to = ?next, "Authorization state changed");
            *state = next;
        }
    }

    fn is_expired(&self, tokens: &OAuthTokens) -> bool {
        tokens.is_expired_at(now_millis(), self.expiry_skew.as_millis() as u64)
    }

    /// Load stored tokens; an unreadable document counts as no tokens.
    async fn load_tokens(&self) -> Option<OAuthTokens> {
        match self.store.load().await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read stored tokens");
                None
            }
        }
    }

    async fn acquire(&self, force: bool) -> Result<String> {
        if !force
            && let Some(tokens) = self.load_tokens().await
        {
            // Another attempt may have finished while this one was queued.
            if !self.is_expired(&tokens) {
                self.set_state(AuthState::Authorized);
                return Ok(tokens.access_token);
            }

            if let Some(refresh_token) = tokens.refresh_token.as_deref() {
                self.set_state(AuthState::Refreshing);
                match refresh_access_token(&self.http, &self.config, refresh_token).await {
                    Ok(refreshed) => {
                        tracing::info!("Access token refreshed");
                        return Ok(self.persist(refreshed).await);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Token refresh failed, starting full authorization");
                    }
                }
            }
        }

        match self.authorize().await {
            Ok(token) => Ok(token),
            Err(e) => {
                self.set_state(AuthState::NoToken);
                Err(e)
            }
        }
    }

    async fn authorize(&self) -> Result<String> {
        self.set_state(AuthState::Authorizing);

        let pkce = PkceChallenge::generate();
        let state = generate_state();
        let listener = CallbackListener::bind(&self.config.redirect_uri, state.clone()).await?;

        // The exchange must repeat the redirect URI sent to the provider.
        let config = OAuthConfig {
            redirect_uri: listener.redirect_uri().to_string(),
            ..self.config.clone()
        };
        let url = build_authorization_url(&config, &pkce, &state);

        tracing::info!(url = %url, "Authorize boardbridge by opening this URL");
        if let Err(e) = self.opener.open(&url) {
            tracing::warn!(error = %e, "Could not open a browser; open the URL manually");
        }

        let code = listener.wait(self.callback_timeout).await?;

        self.set_state(AuthState::Exchanging);
        let tokens = exchange_code_for_tokens(&self.http, &config, &code, &pkce.code_verifier).await?;
        tracing::info!("Authorization complete");
        Ok(self.persist(tokens).await)
    }

    /// Save freshly obtained tokens and hand back the access token.
    ///
    /// A save failure is logged; the caller still gets the token.
    async fn persist(&self, tokens: OAuthTokens) -> String {
        if let Err(e) = self.store.save(&tokens).await {
            tracing::error!(error = %e, "Failed to persist OAuth tokens; they will not survive a restart");
        }
        self.set_state(AuthState::Authorized);
        tokens.access_token
    }
}
