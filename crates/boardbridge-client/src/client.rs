//! The request core every API call passes through.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use boardbridge_config::RateLimitSettings;
use boardbridge_oauth::{Authenticator, OAuthError};
use reqwest::header::{ACCEPT, HeaderMap};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::api::{
    BoardsApi, ConnectorsApi, ItemsApi, MembersApi, TagsApi, WidgetKind, WidgetsApi,
};
use crate::error::{Error, Result};
use crate::rate_limit::{MemoryRateLimitStore, RateLimiter};
use crate::retry::{RetryPolicy, duration_ms, retry_after};

/// Default REST API origin.
pub const DEFAULT_BASE_URL: &str = "https://api.miro.com/";

/// Default timeout for a single network attempt.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Bound on consecutive short admission waits for one request.
const MAX_ADMISSION_ROUNDS: u32 = 10;

// ─────────────────────────────────────────────────────────────────────────────
// Access tokens
// ─────────────────────────────────────────────────────────────────────────────

/// Source of bearer tokens.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync + std::fmt::Debug {
    async fn access_token(&self) -> std::result::Result<String, OAuthError>;
}

#[async_trait]
impl AccessTokenProvider for Authenticator {
    async fn access_token(&self) -> std::result::Result<String, OAuthError> {
        Authenticator::access_token(self).await
    }
}

/// A fixed token, for tests and pre-issued credentials.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl AccessTokenProvider for StaticToken {
    async fn access_token(&self) -> std::result::Result<String, OAuthError> {
        Ok(self.0.clone())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────────────────────────────────────

/// One logical API call; replayed unchanged on every attempt.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base, e.g. `v2/boards`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
        }
    }

    /// Add query parameters from a serializable struct. `None` fields are skipped.
    pub fn query<Q: Serialize + ?Sized>(mut self, query: &Q) -> Result<Self> {
        match serde_json::to_value(query)? {
            Value::Object(map) => {
                for (key, value) in map {
                    let value = match value {
                        Value::Null => continue,
                        Value::String(s) => s,
                        Value::Array(items) => items
                            .iter()
                            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                            .collect::<Vec<_>>()
                            .join(","),
                        other => other.to_string(),
                    };
                    self.query.push((key, value));
                }
                Ok(self)
            }
            Value::Null => Ok(self),
            other => Err(Error::Internal(format!(
                "query parameters must serialize to an object, got {other}"
            ))),
        }
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Why one network attempt failed.
enum AttemptError {
    /// 429 from the remote API.
    RateLimited(HeaderMap),
    /// 5xx from the remote API.
    Server { status: u16, message: String },
    /// Never retried.
    Rejected(Error),
    /// Network or decoding failure.
    Transient(Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// Miro REST API client.
///
/// Every call is admitted by the [`RateLimiter`], authenticated through the
/// [`AccessTokenProvider`] and retried per the [`RetryPolicy`].
///
/// # Example
///
/// ```no_run
/// use boardbridge_client::{BoardClient, StaticToken};
/// use std::sync::Arc;
///
/// # async fn example() -> boardbridge_client::Result<()> {
/// let client = BoardClient::builder()
///     .auth(Arc::new(StaticToken("token".to_string())))
///     .build()?;
///
/// let board = client.boards().get("uXjVOD6LSME=").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct BoardClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    auth: Arc<dyn AccessTokenProvider>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    /// Makes check-then-consume atomic for this process.
    admission: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for BoardClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("retry", &self.inner.retry)
            .finish_non_exhaustive()
    }
}

impl BoardClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The limiter admitting this client's requests.
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.inner.limiter
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.inner.retry
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn boards(&self) -> BoardsApi {
        BoardsApi::new(self.clone())
    }

    pub fn items(&self) -> ItemsApi {
        ItemsApi::new(self.clone())
    }

    /// Access the create/get/update/delete API of one widget kind.
    pub fn widgets(&self, kind: WidgetKind) -> WidgetsApi {
        WidgetsApi::new(self.clone(), kind)
    }

    pub fn sticky_notes(&self) -> WidgetsApi {
        self.widgets(WidgetKind::StickyNote)
    }

    pub fn shapes(&self) -> WidgetsApi {
        self.widgets(WidgetKind::Shape)
    }

    pub fn texts(&self) -> WidgetsApi {
        self.widgets(WidgetKind::Text)
    }

    pub fn cards(&self) -> WidgetsApi {
        self.widgets(WidgetKind::Card)
    }

    pub fn frames(&self) -> WidgetsApi {
        self.widgets(WidgetKind::Frame)
    }

    pub fn connectors(&self) -> ConnectorsApi {
        ConnectorsApi::new(self.clone())
    }

    pub fn tags(&self) -> TagsApi {
        TagsApi::new(self.clone())
    }

    pub fn members(&self) -> MembersApi {
        MembersApi::new(self.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // HTTP methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a URL for an API path.
    pub fn url(&self, path: &str) -> Result<Url> {
        self.inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(Error::from)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json(ApiRequest::new(Method::GET, path)).await
    }

    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.send_json(ApiRequest::new(Method::GET, path).query(query)?)
            .await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(ApiRequest::new(Method::POST, path).json(body)?)
            .await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(ApiRequest::new(Method::PATCH, path).json(body)?)
            .await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(ApiRequest::new(Method::PUT, path).json(body)?)
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.request(ApiRequest::new(Method::DELETE, path)).await?;
        Ok(())
    }

    async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let body = self.request(request).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Run one API call through admission, authentication and retry.
    ///
    /// Returns the decoded JSON body; empty bodies decode to `null`.
    pub async fn request(&self, request: ApiRequest) -> Result<Value> {
        let policy = &self.inner.retry;
        let mut attempt = 0;

        loop {
            self.admit().await?;
            let token = self.inner.auth.access_token().await?;
            let last = policy.is_last_attempt(attempt);

            match self.send_once(&request, &token).await {
                Ok(body) => return Ok(body),
                Err(AttemptError::Rejected(err)) => return Err(err),
                Err(AttemptError::RateLimited(headers)) => {
                    let wait = policy.rate_limit_wait(attempt, &headers);
                    if last || !policy.within_cap(wait) {
                        let retry_after_ms =
                            duration_ms(retry_after(&headers, SystemTime::now()).unwrap_or(wait));
                        return Err(Error::RateLimitExceeded {
                            message: format!(
                                "Miro API rate limit still exceeded after {} attempt(s)",
                                attempt + 1
                            ),
                            retry_after_ms: Some(retry_after_ms),
                        });
                    }
                    tracing::warn!(
                        path = %request.path,
                        attempt,
                        wait_ms = duration_ms(wait),
                        "Rate limited by Miro API, backing off"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(AttemptError::Server { status, message }) => {
                    if last {
                        return Err(Error::Api { status, message });
                    }
                    let wait = policy.transient_wait(attempt);
                    tracing::warn!(
                        path = %request.path,
                        attempt,
                        status,
                        wait_ms = duration_ms(wait),
                        "Miro API server error, retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(AttemptError::Transient(err)) => {
                    if last || !policy.is_retryable(&err) {
                        return Err(Error::MaxRetriesExceeded {
                            attempts: attempt + 1,
                            last_error: err.to_string(),
                        });
                    }
                    let wait = policy.transient_wait(attempt);
                    tracing::warn!(
                        path = %request.path,
                        attempt,
                        error = %err,
                        wait_ms = duration_ms(wait),
                        "Miro API request failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
            }

            attempt += 1;
        }
    }

    /// Wait for local rate-limit capacity and take one unit.
    async fn admit(&self) -> Result<()> {
        let limiter = &self.inner.limiter;
        let max_wait_ms = duration_ms(self.inner.retry.max_admission_wait);
        let _guard = self.inner.admission.lock().await;

        let mut rounds = 0;
        loop {
            let check = limiter.can_make_request().await;
            if check.allowed {
                break;
            }
            rounds += 1;
            match check.wait_time_ms {
                Some(wait_ms) if wait_ms <= max_wait_ms && rounds < MAX_ADMISSION_ROUNDS => {
                    tracing::debug!(wait_ms, "Waiting for local rate-limit capacity");
                    tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                }
                wait_time_ms => {
                    return Err(Error::RateLimitExceeded {
                        message: check
                            .reason
                            .unwrap_or_else(|| "Local rate limit reached".to_string()),
                        retry_after_ms: wait_time_ms,
                    });
                }
            }
        }

        if !limiter.consume_request().await {
            return Err(Error::Internal(
                "rate limiter refused a unit it had just admitted".to_string(),
            ));
        }
        Ok(())
    }

    async fn send_once(
        &self,
        request: &ApiRequest,
        token: &str,
    ) -> std::result::Result<Value, AttemptError> {
        let url = self.url(&request.path).map_err(AttemptError::Rejected)?;

        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), url)
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .timeout(self.inner.timeout);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AttemptError::Transient(Error::Http(e)))?;
        let status = response.status();
        tracing::debug!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            "Miro API response"
        );

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AttemptError::RateLimited(response.headers().clone()));
        }

        if status.is_success() {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| AttemptError::Transient(Error::Http(e)))?;
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(Value::Null);
            }
            return serde_json::from_slice(&bytes)
                .map_err(|e| AttemptError::Transient(Error::Json(e)));
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(status, &body);
        if status.is_server_error() {
            Err(AttemptError::Server {
                status: status.as_u16(),
                message,
            })
        } else {
            Err(AttemptError::Rejected(Error::Api {
                status: status.as_u16(),
                message,
            }))
        }
    }
}

/// Fold `message` and `errors` (or Miro's `context.fields`) into one line.
///
/// Falls back to the status line when the body carries neither.
fn error_message(status: StatusCode, body: &str) -> String {
    let status_line = || match status.canonical_reason() {
        Some(reason) => format!("HTTP {} {}", status.as_u16(), reason),
        None => format!("HTTP {}", status.as_u16()),
    };

    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return status_line();
    };

    let mut parts = Vec::new();
    if let Some(message) = json.get("message").and_then(Value::as_str) {
        parts.push(message.to_string());
    }
    for list in [json.get("errors"), json.pointer("/context/fields")] {
        let Some(Value::Array(items)) = list else {
            continue;
        };
        for item in items {
            match item {
                Value::String(s) => parts.push(s.clone()),
                Value::Object(obj) => {
                    let field = obj.get("field").and_then(Value::as_str);
                    let message = obj.get("message").and_then(Value::as_str);
                    match (field, message) {
                        (Some(field), Some(message)) => parts.push(format!("{field}: {message}")),
                        (None, Some(message)) => parts.push(message.to_string()),
                        _ => {}
                    }
                }
                _ => {}
            }
        }
    }

    if parts.is_empty() {
        status_line()
    } else {
        parts.join("; ")
    }
}

/// Builder for creating a [`BoardClient`].
pub struct ClientBuilder {
    base_url: Option<String>,
    auth: Option<Arc<dyn AccessTokenProvider>>,
    limiter: Option<Arc<RateLimiter>>,
    retry: RetryPolicy,
    timeout: Duration,
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: None,
            auth: None,
            limiter: None,
            retry: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    /// Set the API base URL. Defaults to [`DEFAULT_BASE_URL`].
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the token source. Required.
    pub fn auth(mut self, auth: Arc<dyn AccessTokenProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Share a rate limiter. Defaults to an in-memory limiter with default ceilings.
    pub fn rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<BoardClient> {
        let auth = self
            .auth
            .ok_or_else(|| Error::Config("an access token provider is required".to_string()))?;

        let mut base_url = Url::parse(self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("boardbridge/{}", env!("CARGO_PKG_VERSION")));
        let http = reqwest::Client::builder().user_agent(user_agent).build()?;

        let limiter = self.limiter.unwrap_or_else(|| {
            Arc::new(RateLimiter::new(
                RateLimitSettings::default(),
                Arc::new(MemoryRateLimitStore::new()),
            ))
        });

        Ok(BoardClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                timeout: self.timeout,
                auth,
                limiter,
                retry: self.retry,
                admission: tokio::sync::Mutex::new(()),
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> BoardClient {
        ClientBuilder::new()
            .base_url(base)
            .auth(Arc::new(StaticToken("t".to_string())))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_auth() {
        let result = ClientBuilder::new().build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_default_base_url() {
        let client = ClientBuilder::new()
            .auth(Arc::new(StaticToken("t".to_string())))
            .build()
            .unwrap();
        assert_eq!(client.base_url().as_str(), "https://api.miro.com/");
    }

    #[test]
    fn test_builder_normalizes_trailing_slash() {
        assert_eq!(
            client("http://localhost:8080/proxy").base_url().as_str(),
            "http://localhost:8080/proxy/"
        );
    }

    #[test]
    fn test_url_building() {
        let client = client("http://localhost:8080");
        assert_eq!(
            client.url("v2/boards").unwrap().as_str(),
            "http://localhost:8080/v2/boards"
        );
        assert_eq!(
            client.url("/v2/boards").unwrap().as_str(),
            "http://localhost:8080/v2/boards"
        );
    }

    #[test]
    fn test_query_serialization_skips_none() {
        #[derive(Serialize)]
        struct Q {
            limit: Option<u32>,
            cursor: Option<String>,
            tags: Vec<String>,
        }
        let request = ApiRequest::new(Method::GET, "v2/boards")
            .query(&Q {
                limit: Some(10),
                cursor: None,
                tags: vec!["a".to_string(), "b".to_string()],
            })
            .unwrap();
        assert_eq!(
            request.query,
            vec![
                ("limit".to_string(), "10".to_string()),
                ("tags".to_string(), "a,b".to_string())
            ]
        );
        assert!(ApiRequest::new(Method::GET, "x").query(&5).is_err());
    }

    #[test]
    fn test_error_message_folding() {
        let body = r#"{"type":"error","code":"2.0703","message":"Invalid parameters","context":{"fields":[{"field":"data.content","message":"must not be blank"}]}}"#;
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, body),
            "Invalid parameters; data.content: must not be blank"
        );

        let body = r#"{"errors":["first","second"]}"#;
        assert_eq!(error_message(StatusCode::BAD_REQUEST, body), "first; second");

        assert_eq!(
            error_message(StatusCode::NOT_FOUND, "<html>nope</html>"),
            "HTTP 404 Not Found"
        );
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, r#"{"status":400}"#),
            "HTTP 400 Bad Request"
        );
    }
}
