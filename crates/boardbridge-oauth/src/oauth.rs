//! OAuth 2.0 PKCE primitives: challenge generation, authorization URL,
//! code exchange and refresh.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{OAuthError, Result};

/// The only PKCE method this client speaks.
pub const PKCE_METHOD: &str = "S256";

/// Lifetime assumed when the provider omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// OAuth client configuration.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub authorize_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    /// Create a config for the Miro OAuth endpoints.
    pub fn miro(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            authorize_url: "https://miro.com/oauth/authorize".to_string(),
            token_url: "https://api.miro.com/v1/oauth/token".to_string(),
            redirect_uri: redirect_uri.into(),
            scopes: vec!["boards:read".to_string(), "boards:write".to_string()],
        }
    }

    pub fn with_client_secret(mut self, secret: Option<String>) -> Self {
        self.client_secret = secret;
        self
    }

    pub fn with_endpoints(
        mut self,
        authorize_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        self.authorize_url = authorize_url.into();
        self.token_url = token_url.into();
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }
}

/// PKCE code verifier and challenge pair for one authorization attempt.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub code_verifier: String,
    pub code_challenge: String,
    pub code_challenge_method: &'static str,
}

impl PkceChallenge {
    /// Generate a new PKCE challenge pair from 32 random bytes.
    pub fn generate() -> Self {
        let mut verifier_bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut verifier_bytes);
        let code_verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);
        let code_challenge = Self::challenge_for(&code_verifier);

        Self {
            code_verifier,
            code_challenge,
            code_challenge_method: PKCE_METHOD,
        }
    }

    /// base64url(SHA-256(verifier)), unpadded.
    pub fn challenge_for(verifier: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }
}

/// Generate a random state nonce for CSRF protection.
pub fn generate_state() -> String {
    let mut state_bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut state_bytes);
    URL_SAFE_NO_PAD.encode(state_bytes)
}

/// Build the provider authorization URL.
pub fn build_authorization_url(config: &OAuthConfig, pkce: &PkceChallenge, state: &str) -> String {
    let scope = config.scopes.join(" ");
    let params = [
        ("response_type", "code"),
        ("client_id", config.client_id.as_str()),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("scope", scope.as_str()),
        ("code_challenge", pkce.code_challenge.as_str()),
        ("code_challenge_method", pkce.code_challenge_method),
        ("state", state),
    ];

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let separator = if config.authorize_url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", config.authorize_url, separator, query)
}

/// The persisted token set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Unix epoch milliseconds; absent means unusable without refresh.
    #[serde(default)]
    pub expires_at: Option<u64>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl OAuthTokens {
    /// Whether the token must not be used at `now_ms`.
    ///
    /// `skew_ms` expires the token early so it does not lapse mid-request.
    pub fn is_expired_at(&self, now_ms: u64, skew_ms: u64) -> bool {
        match self.expires_at {
            Some(expires_at) => now_ms.saturating_add(skew_ms) >= expires_at,
            None => true,
        }
    }
}

/// Raw token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    fn into_tokens(self, now_ms: u64) -> OAuthTokens {
        let expires_in = self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        OAuthTokens {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            expires_in,
            scope: self.scope,
            expires_at: Some(now_ms + expires_in * 1000),
        }
    }
}

/// Error body shapes returned by the provider.
#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Exchange an authorization code for tokens.
///
/// `config.redirect_uri` must be the exact value sent in the authorization URL.
pub async fn exchange_code_for_tokens(
    http: &reqwest::Client,
    config: &OAuthConfig,
    code: &str,
    verifier: &str,
) -> Result<OAuthTokens> {
    let params = vec![
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("code_verifier", verifier),
    ];
    post_token_request(http, config, params, "Token exchange").await
}

/// Exchange a refresh token for a new token set.
///
/// Providers may omit `refresh_token` on refresh; the previous one is kept.
pub async fn refresh_access_token(
    http: &reqwest::Client,
    config: &OAuthConfig,
    refresh_token: &str,
) -> Result<OAuthTokens> {
    let params = vec![
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
    ];
    let mut tokens = post_token_request(http, config, params, "Token refresh").await?;
    if tokens.refresh_token.is_none() {
        tokens.refresh_token = Some(refresh_token.to_string());
    }
    Ok(tokens)
}

async fn post_token_request(
    http: &reqwest::Client,
    config: &OAuthConfig,
    mut params: Vec<(&str, &str)>,
    operation: &str,
) -> Result<OAuthTokens> {
    params.push(("client_id", config.client_id.as_str()));
    if let Some(secret) = config.client_secret.as_deref() {
        params.push(("client_secret", secret));
    }

    let response = http
        .post(&config.token_url)
        .header(reqwest::header::ACCEPT, "application/json")
        .form(&params)
        .send()
        .await
        .map_err(|e| OAuthError::Network(format!("{operation} request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(provider_error(status.as_u16(), &body));
    }

    let parsed: TokenResponse = response.json().await.map_err(|e| {
        OAuthError::Serialization(format!("{operation} returned an invalid body: {e}"))
    })?;

    Ok(parsed.into_tokens(now_millis()))
}

fn provider_error(status: u16, body: &str) -> OAuthError {
    match serde_json::from_str::<ProviderErrorBody>(body) {
        Ok(parsed) if parsed.error.is_some() || parsed.message.is_some() => {
            let error = parsed.error.unwrap_or_else(|| format!("http_{status}"));
            let description = parsed
                .error_description
                .or(parsed.message)
                .unwrap_or_default();
            OAuthError::provider(error, description)
        }
        _ => OAuthError::provider(format!("http_{status}"), body.trim()),
    }
}

/// Milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> OAuthConfig {
        OAuthConfig::miro("client-123", "http://127.0.0.1:8899/oauth/callback")
            .with_endpoints(
                format!("{}/oauth/authorize", server.uri()),
                format!("{}/v1/oauth/token", server.uri()),
            )
    }

    #[test]
    fn test_pkce_generation() {
        let first = PkceChallenge::generate();
        let second = PkceChallenge::generate();

        assert_ne!(first.code_verifier, second.code_verifier);
        assert_eq!(first.code_challenge_method, "S256");
        // 32 bytes base64url without padding
        assert_eq!(first.code_verifier.len(), 43);

        for pkce in [&first, &second] {
            let digest = Sha256::digest(pkce.code_verifier.as_bytes());
            assert_eq!(pkce.code_challenge, URL_SAFE_NO_PAD.encode(digest));
            assert!(!pkce.code_challenge.contains('='));
        }
    }

    #[test]
    fn test_challenge_known_vector() {
        // RFC 7636 appendix B
        let challenge = PkceChallenge::challenge_for("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn test_state_generation() {
        let state1 = generate_state();
        let state2 = generate_state();
        assert!(!state1.is_empty());
        assert_ne!(state1, state2);
    }

    #[test]
    fn test_authorization_url() {
        let config = OAuthConfig::miro("client-123", "http://127.0.0.1:8899/oauth/callback");
        let pkce = PkceChallenge::generate();
        let url = build_authorization_url(&config, &pkce, "nonce");

        assert!(url.starts_with("https://miro.com/oauth/authorize?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8899%2Foauth%2Fcallback"));
        assert!(url.contains("scope=boards%3Aread%20boards%3Awrite"));
        assert!(url.contains(&format!("code_challenge={}", pkce.code_challenge)));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains("state=nonce"));
    }

    #[test]
    fn test_token_expiry() {
        let tokens = OAuthTokens {
            access_token: "x".to_string(),
            refresh_token: None,
            token_type: "bearer".to_string(),
            expires_in: 3600,
            scope: None,
            expires_at: Some(10_000),
        };
        assert!(!tokens.is_expired_at(5_000, 0));
        assert!(tokens.is_expired_at(10_000, 0));
        assert!(tokens.is_expired_at(9_500, 1_000));

        let no_expiry = OAuthTokens {
            expires_at: None,
            ..tokens
        };
        assert!(no_expiry.is_expired_at(0, 0));
    }

    #[test]
    fn test_stored_document_without_expiry_fields() {
        let tokens: OAuthTokens = serde_json::from_str(r#"{"access_token":"x"}"#).unwrap();
        assert_eq!(tokens.token_type, "bearer");
        assert!(tokens.expires_at.is_none());
        assert!(tokens.is_expired_at(0, 0));
    }

    #[tokio::test]
    async fn test_exchange_code_for_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/oauth/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=the-code"))
            .and(body_string_contains("code_verifier=the-verifier"))
            .and(body_string_contains("client_id=client-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access",
                "refresh_token": "refresh",
                "token_type": "bearer",
                "expires_in": 3599,
                "scope": "boards:read boards:write",
                "user_id": "3074457350804038700"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let before = now_millis();
        let tokens = exchange_code_for_tokens(
            &reqwest::Client::new(),
            &test_config(&server),
            "the-code",
            "the-verifier",
        )
        .await
        .unwrap();

        assert_eq!(tokens.access_token, "access");
        assert_eq!(tokens.refresh_token.as_deref(), Some("refresh"));
        let expires_at = tokens.expires_at.unwrap();
        assert!(expires_at >= before + 3599 * 1000);
        assert!(expires_at <= now_millis() + 3599 * 1000);
    }

    #[tokio::test]
    async fn test_exchange_sends_client_secret() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("client_secret=shh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access",
                "expires_in": 60
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = test_config(&server).with_client_secret(Some("shh".to_string()));
        let tokens = exchange_code_for_tokens(&reqwest::Client::new(), &config, "c", "v")
            .await
            .unwrap();
        assert_eq!(tokens.expires_in, 60);
    }

    #[tokio::test]
    async fn test_exchange_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Authorization code expired"
            })))
            .mount(&server)
            .await;

        let err = exchange_code_for_tokens(&reqwest::Client::new(), &test_config(&server), "c", "v")
            .await
            .unwrap_err();

        match err {
            OAuthError::Provider { error, description } => {
                assert_eq!(error, "invalid_grant");
                assert_eq!(description, "Authorization code expired");
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refresh_keeps_previous_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=old-refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "new-access",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tokens =
            refresh_access_token(&reqwest::Client::new(), &test_config(&server), "old-refresh")
                .await
                .unwrap();
        assert_eq!(tokens.access_token, "new-access");
        assert_eq!(tokens.refresh_token.as_deref(), Some("old-refresh"));
    }

    #[tokio::test]
    async fn test_refresh_non_json_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let err = refresh_access_token(&reqwest::Client::new(), &test_config(&server), "r")
            .await
            .unwrap_err();
        match err {
            OAuthError::Provider { error, description } => {
                assert_eq!(error, "http_502");
                assert_eq!(description, "Bad Gateway");
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }
}
