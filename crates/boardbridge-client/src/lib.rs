//! Rate-limited, retrying client for the Miro REST API.
//!
//! Every call goes through [`BoardClient::request`], which
//!
//! 1. waits for (or fails fast on) local rate-limit capacity,
//! 2. consumes one unit from both rate-limit buckets,
//! 3. obtains a bearer token from an [`AccessTokenProvider`],
//! 4. sends the request and classifies the response, retrying 429, 5xx and
//!    network failures per the [`RetryPolicy`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use boardbridge_client::{BoardClient, StaticToken, WidgetRequest};
//!
//! # async fn example() -> boardbridge_client::Result<()> {
//! let client = BoardClient::builder()
//!     .auth(Arc::new(StaticToken("token".to_string())))
//!     .build()?;
//!
//! let note = client
//!     .sticky_notes()
//!     .create(
//!         "uXjVOD6LSME=",
//!         &WidgetRequest {
//!             data: Some(serde_json::json!({"content": "Hello"})),
//!             ..Default::default()
//!         },
//!     )
//!     .await?;
//! println!("{note}");
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod rate_limit;
pub mod retry;
pub mod types;

pub use api::{BoardsApi, ConnectorsApi, ItemsApi, MembersApi, TagsApi, WidgetKind, WidgetsApi};
pub use client::{AccessTokenProvider, ApiRequest, BoardClient, ClientBuilder, StaticToken};
pub use error::{Error, Result};
pub use rate_limit::{
    FileRateLimitStore, MemoryRateLimitStore, RateLimitCheck, RateLimitStatus, RateLimiter,
};
pub use retry::RetryPolicy;
pub use types::*;
