//! Persistence for the shared rate-limit document.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::bucket::RateLimitBucket;
use crate::error::{Error, Result};

/// Both buckets plus the time of the last consumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitState {
    pub user_bucket: RateLimitBucket,
    pub app_bucket: RateLimitBucket,
    pub last_updated: u64,
}

/// Storage for [`RateLimitState`].
#[async_trait]
pub trait RateLimitStore: Send + Sync + std::fmt::Debug {
    async fn load(&self) -> Result<Option<RateLimitState>>;
    async fn save(&self, state: &RateLimitState) -> Result<()>;
    /// Remove the document. Deleting nothing is not an error.
    async fn delete(&self) -> Result<()>;
}

/// Shared store handle.
pub type SharedRateLimitStore = Arc<dyn RateLimitStore>;

/// JSON file store.
#[derive(Debug)]
pub struct FileRateLimitStore {
    path: PathBuf,
}

impl FileRateLimitStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RateLimitStore for FileRateLimitStore {
    async fn load(&self) -> Result<Option<RateLimitState>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Persistence(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        serde_json::from_str(&content).map(Some).map_err(|e| {
            Error::Persistence(format!("Failed to parse {}: {}", self.path.display(), e))
        })
    }

    async fn save(&self, state: &RateLimitState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Persistence(format!("Failed to create state directory: {}", e)))?;
        }

        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| Error::Persistence(format!("Failed to write rate-limit state: {}", e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::Persistence(format!("Failed to replace rate-limit state: {}", e)))
    }

    async fn delete(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Persistence(format!(
                "Failed to delete rate-limit state: {}",
                e
            ))),
        }
    }
}

/// In-memory store for tests and single-process use.
#[derive(Debug, Default)]
pub struct MemoryRateLimitStore {
    state: RwLock<Option<RateLimitState>>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: RateLimitState) -> Self {
        Self {
            state: RwLock::new(Some(state)),
        }
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn load(&self) -> Result<Option<RateLimitState>> {
        Ok(self.state.read().await.clone())
    }

    async fn save(&self, state: &RateLimitState) -> Result<()> {
        *self.state.write().await = Some(state.clone());
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        *self.state.write().await = None;
        Ok(())
    }
}
