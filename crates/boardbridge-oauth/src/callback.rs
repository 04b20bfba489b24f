//! Short-lived local listener that captures the OAuth redirect.
//!
//! The listener binds the host and port of the configured redirect URI and
//! answers exactly one request on its path: the first callback settles the
//! authorization attempt (successfully or not) and every other path gets a
//! 404. [`CallbackListener::wait`] shuts the server down once the attempt is
//! settled or the timeout elapses.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::{OAuthError, Result};

/// How long in-flight browser responses may take to drain after settlement.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

const HTML_SUCCESS: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>boardbridge - Authorization Successful</title>
  <style>
    body { font-family: system-ui, -apple-system, sans-serif; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0; }
    .container { text-align: center; padding: 2rem; }
    h1 { color: #16a34a; }
  </style>
</head>
<body>
  <div class="container">
    <h1>Authorization Successful</h1>
    <p>You can close this window and return to your assistant.</p>
  </div>
</body>
</html>"#;

fn html_error(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <title>boardbridge - Authorization Failed</title>
  <style>
    body {{ font-family: system-ui, -apple-system, sans-serif; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0; }}
    .container {{ text-align: center; padding: 2rem; }}
    h1 {{ color: #dc2626; }}
    .error {{ font-family: monospace; margin-top: 1rem; }}
  </style>
</head>
<body>
  <div class="container">
    <h1>Authorization Failed</h1>
    <div class="error">{}</div>
  </div>
</body>
</html>"#,
        html_escape(message)
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

struct CallbackState {
    expected_state: String,
    outcome: Mutex<Option<oneshot::Sender<Result<String>>>>,
}

/// A bound redirect listener for one authorization attempt.
pub struct CallbackListener {
    local_addr: SocketAddr,
    redirect_uri: String,
    outcome: oneshot::Receiver<Result<String>>,
    shutdown: Option<oneshot::Sender<()>>,
    server: JoinHandle<()>,
}

impl CallbackListener {
    /// Bind the host, port and path of `redirect_uri` and start serving.
    ///
    /// A redirect URI with port 0 binds an ephemeral port; use
    /// [`redirect_uri`](Self::redirect_uri) for the effective value.
    pub async fn bind(redirect_uri: &str, expected_state: impl Into<String>) -> Result<Self> {
        let parsed = url::Url::parse(redirect_uri)
            .map_err(|e| OAuthError::callback(format!("invalid redirect URI '{redirect_uri}': {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| OAuthError::callback(format!("redirect URI '{redirect_uri}' has no host")))?
            .to_string();
        let port = parsed.port_or_known_default().unwrap_or(80);
        let path = parsed.path().to_string();

        let listener = TcpListener::bind(format!("{host}:{port}"))
            .await
            .map_err(|e| OAuthError::callback(format!("failed to bind {host}:{port}: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| OAuthError::callback(format!("failed to read listener address: {e}")))?;

        let redirect_uri = if port == 0 {
            let mut effective = parsed.clone();
            // Setting a port on an http(s) URL with a host cannot fail.
            let _ = effective.set_port(Some(local_addr.port()));
            effective.to_string()
        } else {
            redirect_uri.to_string()
        };

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let state = Arc::new(CallbackState {
            expected_state: expected_state.into(),
            outcome: Mutex::new(Some(outcome_tx)),
        });

        let router = Router::new()
            .route(&path, get(handle_callback))
            .fallback(not_found)
            .with_state(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                tracing::warn!(error = %e, "OAuth callback listener failed");
            }
        });

        tracing::debug!(addr = %local_addr, path = %path, "OAuth callback listener started");

        Ok(Self {
            local_addr,
            redirect_uri,
            outcome: outcome_rx,
            shutdown: Some(shutdown_tx),
            server,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Redirect URI to send to the provider.
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Wait for the callback, returning the authorization code.
    ///
    /// The listener is closed on every exit path.
    pub async fn wait(mut self, timeout: Duration) -> Result<String> {
        let result = match tokio::time::timeout(timeout, &mut self.outcome).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(OAuthError::callback("callback listener stopped unexpectedly")),
            Err(_) => Err(OAuthError::CallbackTimeout(timeout)),
        };

        self.close().await;
        result
    }

    async fn close(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut self.server)
            .await
            .is_err()
        {
            self.server.abort();
        }
        tracing::debug!(addr = %self.local_addr, "OAuth callback listener closed");
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn handle_callback(
    State(state): State<Arc<CallbackState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(sender) = state.outcome.lock().take() else {
        return page(
            StatusCode::GONE,
            html_error("This authorization attempt has already completed."),
        );
    };

    let outcome = validate_callback(&state.expected_state, &params);
    let response = match &outcome {
        Ok(_) => page(StatusCode::OK, HTML_SUCCESS.to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "Rejected OAuth callback");
            page(StatusCode::BAD_REQUEST, html_error(&e.to_string()))
        }
    };

    let _ = sender.send(outcome);
    response
}

/// State is checked before anything else, so a page that does not know the
/// nonce cannot settle the attempt, not even with an `error` parameter.
fn validate_callback(expected_state: &str, params: &HashMap<String, String>) -> Result<String> {
    match params.get("state") {
        Some(returned) if returned == expected_state => {}
        Some(_) => return Err(OAuthError::callback("state mismatch")),
        None => return Err(OAuthError::callback("missing state parameter")),
    }

    if let Some(error) = params.get("error") {
        let description = params
            .get("error_description")
            .cloned()
            .unwrap_or_default();
        return Err(OAuthError::provider(error.clone(), description));
    }

    match params.get("code") {
        Some(code) if !code.is_empty() => Ok(code.clone()),
        _ => Err(OAuthError::callback("no authorization code provided")),
    }
}

fn page(status: StatusCode, body: String) -> Response {
    (status, [(header::CONNECTION, "close")], Html(body)).into_response()
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}

#[cfg(test)]
mod tests {
    use super::*;

    const REDIRECT: &str = "http://127.0.0.1:0/oauth/callback";

    fn callback_url(listener: &CallbackListener, query: &str) -> String {
        format!("http://{}/oauth/callback?{}", listener.local_addr(), query)
    }

    #[tokio::test]
    async fn test_successful_callback() {
        let listener = CallbackListener::bind(REDIRECT, "nonce").await.unwrap();
        let url = callback_url(&listener, "code=abc&state=nonce");

        let browser = tokio::spawn(async move { reqwest::get(url).await.unwrap() });
        let code = listener.wait(Duration::from_secs(5)).await.unwrap();
        assert_eq!(code, "abc");

        let response = browser.await.unwrap();
        assert_eq!(response.status(), 200);
        assert!(response.text().await.unwrap().contains("Authorization Successful"));
    }

    #[tokio::test]
    async fn test_effective_redirect_uri() {
        let listener = CallbackListener::bind(REDIRECT, "nonce").await.unwrap();
        assert_eq!(
            listener.redirect_uri(),
            format!("http://127.0.0.1:{}/oauth/callback", listener.local_addr().port())
        );
    }

    #[tokio::test]
    async fn test_state_mismatch_rejected() {
        let listener = CallbackListener::bind(REDIRECT, "nonce").await.unwrap();
        let url = callback_url(&listener, "code=abc&state=forged");

        let browser = tokio::spawn(async move { reqwest::get(url).await.unwrap() });
        let err = listener.wait(Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, OAuthError::Callback(ref m) if m.contains("state mismatch")));

        let response = browser.await.unwrap();
        assert_eq!(response.status(), 400);
        assert!(response.text().await.unwrap().contains("Authorization Failed"));
    }

    #[tokio::test]
    async fn test_provider_error_param() {
        let listener = CallbackListener::bind(REDIRECT, "nonce").await.unwrap();
        let url = callback_url(
            &listener,
            "error=access_denied&error_description=User%20declined&state=nonce",
        );

        let browser = tokio::spawn(async move { reqwest::get(url).await.unwrap() });
        let err = listener.wait(Duration::from_secs(5)).await.unwrap_err();
        match err {
            OAuthError::Provider { error, description } => {
                assert_eq!(error, "access_denied");
                assert_eq!(description, "User declined");
            }
            other => panic!("expected provider error, got {other:?}"),
        }
        browser.await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_code_rejected() {
        let listener = CallbackListener::bind(REDIRECT, "nonce").await.unwrap();
        let url = callback_url(&listener, "state=nonce");

        let browser = tokio::spawn(async move { reqwest::get(url).await.unwrap() });
        let err = listener.wait(Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, OAuthError::Callback(_)));
        browser.await.unwrap();
    }

    #[tokio::test]
    async fn test_other_paths_return_404() {
        let listener = CallbackListener::bind(REDIRECT, "nonce").await.unwrap();
        let response = reqwest::get(format!("http://{}/favicon.ico", listener.local_addr()))
            .await
            .unwrap();
        assert_eq!(response.status(), 404);

        // The attempt is still pending after a stray request.
        let url = callback_url(&listener, "code=abc&state=nonce");
        let browser = tokio::spawn(async move { reqwest::get(url).await.unwrap() });
        assert_eq!(listener.wait(Duration::from_secs(5)).await.unwrap(), "abc");
        browser.await.unwrap();
    }

    #[tokio::test]
    async fn test_timeout_closes_listener() {
        let listener = CallbackListener::bind(REDIRECT, "nonce").await.unwrap();
        let addr = listener.local_addr();

        let err = listener.wait(Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, OAuthError::CallbackTimeout(_)));

        let result = reqwest::get(format!("http://{addr}/oauth/callback?code=a&state=nonce")).await;
        assert!(result.is_err());
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_validate_callback_checks_state_before_error() {
        let forged = params(&[("error", "access_denied"), ("state", "forged")]);
        assert!(matches!(
            validate_callback("nonce", &forged),
            Err(OAuthError::Callback(ref m)) if m.contains("state mismatch")
        ));

        let stateless = params(&[("error", "access_denied")]);
        assert!(matches!(
            validate_callback("nonce", &stateless),
            Err(OAuthError::Callback(ref m)) if m.contains("missing state")
        ));

        let genuine = params(&[("error", "access_denied"), ("state", "nonce")]);
        assert!(matches!(
            validate_callback("nonce", &genuine),
            Err(OAuthError::Provider { .. })
        ));
    }

    #[tokio::test]
    async fn test_forged_error_callback_rejected_as_callback_error() {
        let listener = CallbackListener::bind(REDIRECT, "nonce").await.unwrap();
        let url = callback_url(&listener, "error=access_denied&state=forged");

        let browser = tokio::spawn(async move { reqwest::get(url).await.unwrap() });
        let err = listener.wait(Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, OAuthError::Callback(ref m) if m.contains("state mismatch")));
        assert_eq!(browser.await.unwrap().status(), 400);
    }

    #[tokio::test]
    async fn test_bind_failure_is_callback_error() {
        let first = CallbackListener::bind(REDIRECT, "a").await.unwrap();
        let taken = format!("http://127.0.0.1:{}/oauth/callback", first.local_addr().port());
        let err = CallbackListener::bind(&taken, "b").await.err().unwrap();
        assert!(matches!(err, OAuthError::Callback(ref m) if m.contains("failed to bind")));
    }
}
