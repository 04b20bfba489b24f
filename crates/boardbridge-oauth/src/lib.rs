//! OAuth 2.0 Authorization Code + PKCE for the Miro REST API.
//!
//! # Components
//!
//! - [`oauth`] - PKCE generation, authorization URL, code and refresh exchanges
//! - [`token_store`] - Durable single-document token persistence
//! - [`callback`] - Short-lived local listener capturing the browser redirect
//! - [`authenticator`] - Single-flight "give me a valid access token" state machine

pub mod authenticator;
pub mod callback;
pub mod error;
pub mod oauth;
pub mod token_store;

pub use authenticator::{
    AuthState, Authenticator, AuthenticatorBuilder, DEFAULT_EXPIRY_SKEW, SystemBrowser, UrlOpener,
};
pub use callback::CallbackListener;
pub use error::{OAuthError, Result};
pub use oauth::{
    OAuthConfig, OAuthTokens, PKCE_METHOD, PkceChallenge, build_authorization_url,
    exchange_code_for_tokens, generate_state, refresh_access_token,
};
pub use token_store::{FileTokenStore, MemoryTokenStore, SharedTokenStore, TokenInfo, TokenStore};
