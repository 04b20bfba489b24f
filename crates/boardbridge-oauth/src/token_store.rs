//! Durable persistence for the single OAuth token document.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{OAuthError, Result};
use crate::oauth::OAuthTokens;

// ============================================================================
// TokenStore Trait
// ============================================================================

/// Storage for the persisted token set.
#[async_trait]
pub trait TokenStore: Send + Sync + std::fmt::Debug {
    /// Load the stored tokens. A missing or unreadable document yields `None`.
    async fn load(&self) -> Result<Option<OAuthTokens>>;

    /// Replace the stored tokens.
    async fn save(&self, tokens: &OAuthTokens) -> Result<()>;

    /// Remove the stored tokens. Deleting nothing is not an error.
    async fn delete(&self) -> Result<()>;
}

/// Shared token store for use across async contexts.
pub type SharedTokenStore = Arc<dyn TokenStore>;

// ============================================================================
// FileTokenStore
// ============================================================================

/// JSON file token store.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the token document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create a shared store at `path`.
    pub fn shared(path: impl Into<PathBuf>) -> SharedTokenStore {
        Arc::new(Self::new(path))
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<OAuthTokens>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(OAuthError::Persistence(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        match serde_json::from_str::<OAuthTokens>(&content) {
            Ok(tokens) => Ok(Some(tokens)),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Ignoring unreadable token document"
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, tokens: &OAuthTokens) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                OAuthError::Persistence(format!("Failed to create token directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(tokens)
            .map_err(|e| OAuthError::Serialization(format!("Failed to serialize tokens: {}", e)))?;

        // Write then rename so a crash never leaves a half-written document.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| OAuthError::Persistence(format!("Failed to write token file: {}", e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| OAuthError::Persistence(format!("Failed to replace token file: {}", e)))?;

        tracing::debug!(path = %self.path.display(), "Tokens saved");
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(OAuthError::Persistence(format!(
                "Failed to delete token file: {}",
                e
            ))),
        }
    }
}

// ============================================================================
// MemoryTokenStore
// ============================================================================

/// In-memory token store, used by tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<Option<OAuthTokens>>,
    save_count: std::sync::atomic::AtomicU32,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: OAuthTokens) -> Self {
        Self {
            tokens: RwLock::new(Some(tokens)),
            save_count: std::sync::atomic::AtomicU32::new(0),
        }
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> u32 {
        self.save_count.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<OAuthTokens>> {
        Ok(self.tokens.read().await.clone())
    }

    async fn save(&self, tokens: &OAuthTokens) -> Result<()> {
        *self.tokens.write().await = Some(tokens.clone());
        self.save_count
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        *self.tokens.write().await = None;
        Ok(())
    }
}

// ============================================================================
// TokenInfo
// ============================================================================

/// Information about stored tokens for display.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TokenInfo {
    pub expires_in_secs: u64,
    pub is_expired: bool,
    pub has_refresh_token: bool,
    pub scope: Option<String>,
}

impl TokenInfo {
    /// Summarize `tokens` as of `now_ms`.
    pub fn from_tokens(tokens: &OAuthTokens, now_ms: u64, skew_ms: u64) -> Self {
        let expires_in_secs = tokens
            .expires_at
            .map(|at| at.saturating_sub(now_ms) / 1000)
            .unwrap_or(0);

        Self {
            expires_in_secs,
            is_expired: tokens.is_expired_at(now_ms, skew_ms),
            has_refresh_token: tokens.refresh_token.is_some(),
            scope: tokens.scope.clone(),
        }
    }

    pub fn expires_in_display(&self) -> String {
        if self.is_expired {
            if self.has_refresh_token {
                "Expired (will refresh on next use)".to_string()
            } else {
                "Expired (login required)".to_string()
            }
        } else {
            let hours = self.expires_in_secs / 3600;
            let minutes = (self.expires_in_secs % 3600) / 60;
            format!("{}h {}m", hours, minutes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_tokens() -> OAuthTokens {
        OAuthTokens {
            access_token: "test_access".to_string(),
            refresh_token: Some("test_refresh".to_string()),
            token_type: "bearer".to_string(),
            expires_in: 3600,
            scope: Some("boards:read boards:write".to_string()),
            expires_at: Some(9_999_999_999_999),
        }
    }

    #[tokio::test]
    async fn test_file_load_missing() {
        let temp = tempdir().unwrap();
        let store = FileTokenStore::new(temp.path().join("oauth-tokens.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_save_and_load() {
        let temp = tempdir().unwrap();
        let store = FileTokenStore::new(temp.path().join("nested").join("oauth-tokens.json"));

        store.save(&sample_tokens()).await.unwrap();
        assert!(store.path().exists());

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, sample_tokens());
    }

    #[tokio::test]
    async fn test_file_corrupt_treated_as_absent() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("oauth-tokens.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileTokenStore::new(&path);
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_delete_is_idempotent() {
        let temp = tempdir().unwrap();
        let store = FileTokenStore::new(temp.path().join("oauth-tokens.json"));

        store.delete().await.unwrap();
        store.save(&sample_tokens()).await.unwrap();
        store.delete().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
        store.delete().await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryTokenStore::new();
        assert!(store.load().await.unwrap().is_none());

        store.save(&sample_tokens()).await.unwrap();
        assert_eq!(store.save_count(), 1);
        assert_eq!(
            store.load().await.unwrap().unwrap().access_token,
            "test_access"
        );

        store.delete().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[test]
    fn test_token_info_display() {
        let mut tokens = sample_tokens();
        tokens.expires_at = Some(10_000 + 2 * 3600 * 1000 + 5 * 60 * 1000);

        let info = TokenInfo::from_tokens(&tokens, 10_000, 0);
        assert!(!info.is_expired);
        assert_eq!(info.expires_in_display(), "2h 5m");

        let info = TokenInfo::from_tokens(&tokens, u64::MAX / 2, 0);
        assert!(info.is_expired);
        assert_eq!(info.expires_in_secs, 0);
        assert_eq!(info.expires_in_display(), "Expired (will refresh on next use)");

        tokens.refresh_token = None;
        let info = TokenInfo::from_tokens(&tokens, u64::MAX / 2, 0);
        assert_eq!(info.expires_in_display(), "Expired (login required)");
    }
}
