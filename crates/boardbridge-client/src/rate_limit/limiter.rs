//! Dual token-bucket admission control.
//!
//! The user bucket enforces the per-second ceiling of a single caller, the
//! app bucket the per-minute ceiling of the application. State is reloaded
//! from the store before every operation so cooperating processes share the
//! ceilings. There is no cross-process lock: two processes may both see the
//! last token and both consume it.

use std::sync::Arc;
use std::time::Duration;

use boardbridge_config::RateLimitSettings;
use serde::Serialize;
use tokio::sync::Mutex;

use super::bucket::RateLimitBucket;
use super::clock::{Clock, SystemClock};
use super::store::{RateLimitState, SharedRateLimitStore};
use crate::error::Result;

/// Persisted state older than this is replaced with full buckets.
pub const STALE_AFTER_MS: u64 = 5 * 60 * 1000;

const USER_INTERVAL_MS: u64 = 1000;
const APP_INTERVAL_MS: u64 = 60_000;

/// Outcome of an admission check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimitCheck {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RateLimitCheck {
    fn allowed() -> Self {
        Self {
            allowed: true,
            wait_time_ms: None,
            reason: None,
        }
    }

    fn denied(wait_time_ms: u64, reason: String) -> Self {
        Self {
            allowed: false,
            wait_time_ms: Some(wait_time_ms),
            reason: Some(reason),
        }
    }
}

/// Snapshot of one bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketStatus {
    pub remaining: f64,
    pub capacity: f64,
    /// Tokens per second.
    pub refill_rate: f64,
    /// Milliseconds until another whole token is available; 0 when full.
    pub next_refill_ms: u64,
}

impl From<&RateLimitBucket> for BucketStatus {
    fn from(bucket: &RateLimitBucket) -> Self {
        Self {
            remaining: (bucket.tokens * 100.0).round() / 100.0,
            capacity: bucket.capacity,
            refill_rate: (bucket.refill_rate * 1000.0).round() / 1000.0,
            next_refill_ms: bucket.next_refill_ms(),
        }
    }
}

/// Read-only view of both buckets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimitStatus {
    pub user: BucketStatus,
    pub app: BucketStatus,
    pub last_updated: u64,
}

/// Client-side rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
    settings: RateLimitSettings,
    store: SharedRateLimitStore,
    clock: Arc<dyn Clock>,
    state: Mutex<RateLimitState>,
}

impl RateLimiter {
    /// Create a limiter on the system clock.
    pub fn new(settings: RateLimitSettings, store: SharedRateLimitStore) -> Self {
        Self::with_clock(settings, store, Arc::new(SystemClock))
    }

    pub fn with_clock(
        settings: RateLimitSettings,
        store: SharedRateLimitStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = fresh_state(&settings, clock.now_ms());
        Self {
            settings,
            store,
            clock,
            state: Mutex::new(state),
        }
    }

    pub fn settings(&self) -> RateLimitSettings {
        self.settings
    }

    /// Report whether one request may proceed now.
    ///
    /// The user bucket is checked first; the app bucket only when the user
    /// bucket has capacity.
    pub async fn can_make_request(&self) -> RateLimitCheck {
        let now = self.clock.now_ms();
        let mut state = self.state.lock().await;
        self.reload(&mut state, now).await;

        if !state.user_bucket.has_token() {
            return RateLimitCheck::denied(
                state.user_bucket.wait_time_ms(),
                format!(
                    "Per-user rate limit of {} requests/second reached",
                    self.settings.user_requests_per_second
                ),
            );
        }
        if !state.app_bucket.has_token() {
            return RateLimitCheck::denied(
                state.app_bucket.wait_time_ms(),
                format!(
                    "Application rate limit of {} requests/minute reached",
                    self.settings.app_requests_per_minute
                ),
            );
        }
        RateLimitCheck::allowed()
    }

    /// Take one unit from both buckets, or from neither.
    pub async fn consume_request(&self) -> bool {
        let now = self.clock.now_ms();
        let mut state = self.state.lock().await;
        self.reload(&mut state, now).await;

        if !(state.user_bucket.has_token() && state.app_bucket.has_token()) {
            return false;
        }
        state.user_bucket.try_consume();
        state.app_bucket.try_consume();
        state.last_updated = now;

        tracing::trace!(
            user_remaining = state.user_bucket.tokens,
            app_remaining = state.app_bucket.tokens,
            "Consumed rate-limit unit"
        );

        if let Err(e) = self.store.save(&state).await {
            tracing::warn!(error = %e, "Failed to persist rate-limit state");
        }
        true
    }

    /// Sleep until a request is allowed if that takes at most `max_wait_ms`.
    ///
    /// Returns `false` without sleeping when the wait would be longer.
    pub async fn wait_for_availability(&self, max_wait_ms: u64) -> bool {
        let check = self.can_make_request().await;
        if check.allowed {
            return true;
        }
        match check.wait_time_ms {
            Some(wait_ms) if wait_ms <= max_wait_ms => {
                tracing::debug!(wait_ms, "Waiting for rate-limit capacity");
                tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                true
            }
            _ => false,
        }
    }

    /// Snapshot both buckets.
    pub async fn get_rate_limit_status(&self) -> RateLimitStatus {
        let now = self.clock.now_ms();
        let mut state = self.state.lock().await;
        self.reload(&mut state, now).await;

        RateLimitStatus {
            user: BucketStatus::from(&state.user_bucket),
            app: BucketStatus::from(&state.app_bucket),
            last_updated: state.last_updated,
        }
    }

    /// Refill both buckets and delete the persisted document.
    pub async fn reset(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        *state = fresh_state(&self.settings, self.clock.now_ms());
        self.store.delete().await?;
        tracing::info!("Rate-limit state reset");
        Ok(())
    }

    /// Replace in-memory state with the stored document, or with fresh
    /// buckets when the document is missing or stale, then refill.
    async fn reload(&self, state: &mut RateLimitState, now: u64) {
        match self.store.load().await {
            Ok(Some(stored)) if now.saturating_sub(stored.last_updated) > STALE_AFTER_MS => {
                tracing::debug!(
                    last_updated = stored.last_updated,
                    "Discarding stale rate-limit state"
                );
                *state = fresh_state(&self.settings, now);
            }
            Ok(Some(stored)) => *state = self.reconcile(stored),
            // Deleted elsewhere (another process reset it): start full.
            Ok(None) => *state = fresh_state(&self.settings, now),
            Err(e) => {
                tracing::warn!(error = %e, "Could not load rate-limit state; using in-memory buckets");
            }
        }
        state.user_bucket.refill(now);
        state.app_bucket.refill(now);
    }

    /// Re-derive bucket ceilings from configuration.
    fn reconcile(&self, mut stored: RateLimitState) -> RateLimitState {
        let user = self.settings.user_requests_per_second;
        let app = self.settings.app_requests_per_minute;
        if !stored.user_bucket.matches(user, USER_INTERVAL_MS) {
            stored.user_bucket.reconfigure(user, USER_INTERVAL_MS);
        }
        if !stored.app_bucket.matches(app, APP_INTERVAL_MS) {
            stored.app_bucket.reconfigure(app, APP_INTERVAL_MS);
        }
        stored
    }
}

fn fresh_state(settings: &RateLimitSettings, now: u64) -> RateLimitState {
    RateLimitState {
        user_bucket: RateLimitBucket::new(settings.user_requests_per_second, USER_INTERVAL_MS, now),
        app_bucket: RateLimitBucket::new(settings.app_requests_per_minute, APP_INTERVAL_MS, now),
        last_updated: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::rate_limit::clock::ManualClock;
    use crate::rate_limit::store::{FileRateLimitStore, MemoryRateLimitStore, RateLimitStore};
    use async_trait::async_trait;

    const T0: u64 = 1_700_000_000_000;

    fn settings(user: u32, app: u32) -> RateLimitSettings {
        RateLimitSettings {
            user_requests_per_second: user,
            app_requests_per_minute: app,
        }
    }

    fn limiter(user: u32, app: u32) -> (RateLimiter, Arc<ManualClock>, Arc<MemoryRateLimitStore>) {
        let clock = Arc::new(ManualClock::new(T0));
        let store = Arc::new(MemoryRateLimitStore::new());
        let limiter = RateLimiter::with_clock(settings(user, app), store.clone(), clock.clone());
        (limiter, clock, store)
    }

    #[derive(Debug)]
    struct BrokenStore;

    #[async_trait]
    impl RateLimitStore for BrokenStore {
        async fn load(&self) -> Result<Option<RateLimitState>> {
            Err(Error::Persistence("unreadable".to_string()))
        }
        async fn save(&self, _state: &RateLimitState) -> Result<()> {
            Err(Error::Persistence("read-only".to_string()))
        }
        async fn delete(&self) -> Result<()> {
            Err(Error::Persistence("read-only".to_string()))
        }
    }

    #[tokio::test]
    async fn test_back_to_back_consumption() {
        let (limiter, _clock, _store) = limiter(2, 1000);
        assert!(limiter.consume_request().await);
        assert!(limiter.consume_request().await);
        assert!(!limiter.consume_request().await);
    }

    #[tokio::test]
    async fn test_refill_over_virtual_time() {
        let (limiter, clock, _store) = limiter(10, 1000);
        for _ in 0..10 {
            assert!(limiter.consume_request().await);
        }
        assert!(!limiter.can_make_request().await.allowed);

        clock.advance(250);
        let status = limiter.get_rate_limit_status().await;
        assert_eq!(status.user.remaining, 2.5);

        assert!(limiter.consume_request().await);
        assert!(limiter.consume_request().await);
        assert!(!limiter.consume_request().await);
    }

    #[tokio::test]
    async fn test_user_reason_reported_first() {
        let (limiter, _clock, _store) = limiter(1, 1);
        assert!(limiter.consume_request().await);

        let check = limiter.can_make_request().await;
        assert!(!check.allowed);
        assert_eq!(check.wait_time_ms, Some(1000));
        assert!(check.reason.unwrap().contains("Per-user"));
    }

    #[tokio::test]
    async fn test_app_bucket_checked_when_user_has_capacity() {
        let (limiter, clock, _store) = limiter(10, 2);
        assert!(limiter.consume_request().await);
        assert!(limiter.consume_request().await);
        clock.advance(1);

        let check = limiter.can_make_request().await;
        assert!(!check.allowed);
        assert!(check.reason.unwrap().contains("Application"));
        // one token at 2/min takes 30s, less the 1ms already accrued
        let wait = check.wait_time_ms.unwrap();
        assert!((29_990..=30_000).contains(&wait));
    }

    #[tokio::test]
    async fn test_consume_is_all_or_nothing() {
        let (limiter, clock, store) = limiter(1, 1000);
        assert!(limiter.consume_request().await);
        let before = store.load().await.unwrap().unwrap();

        clock.advance(10);
        assert!(!limiter.consume_request().await);
        let status = limiter.get_rate_limit_status().await;
        // the app bucket only gained refill, nothing was taken
        assert!(status.app.remaining >= before.app_bucket.tokens);
        assert_eq!(store.load().await.unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn test_stale_document_discarded() {
        let clock = Arc::new(ManualClock::new(T0));
        let old = T0 - STALE_AFTER_MS - 1;
        let mut user_bucket = RateLimitBucket::new(5, USER_INTERVAL_MS, old);
        user_bucket.tokens = 0.0;
        let mut app_bucket = RateLimitBucket::new(100, APP_INTERVAL_MS, old);
        app_bucket.tokens = 0.0;
        let store = Arc::new(MemoryRateLimitStore::with_state(RateLimitState {
            user_bucket,
            app_bucket,
            last_updated: old,
        }));

        let limiter = RateLimiter::with_clock(settings(5, 100), store, clock);
        let status = limiter.get_rate_limit_status().await;
        assert_eq!(status.user.remaining, 5.0);
        assert_eq!(status.app.remaining, 100.0);
        assert_eq!(status.last_updated, T0);
    }

    #[tokio::test]
    async fn test_shared_document_between_limiters() {
        let clock = Arc::new(ManualClock::new(T0));
        let store = Arc::new(MemoryRateLimitStore::new());
        let first = RateLimiter::with_clock(settings(2, 1000), store.clone(), clock.clone());
        let second = RateLimiter::with_clock(settings(2, 1000), store, clock);

        assert!(first.consume_request().await);
        assert!(second.consume_request().await);
        assert!(!first.consume_request().await);
        assert!(!second.can_make_request().await.allowed);
    }

    #[tokio::test]
    async fn test_reset_by_another_limiter_is_observed() {
        let clock = Arc::new(ManualClock::new(T0));
        let store = Arc::new(MemoryRateLimitStore::new());
        let serving = RateLimiter::with_clock(settings(1, 1000), store.clone(), clock.clone());
        let cli = RateLimiter::with_clock(settings(1, 1000), store.clone(), clock);

        assert!(serving.consume_request().await);
        assert!(!serving.can_make_request().await.allowed);

        cli.reset().await.unwrap();
        assert!(store.load().await.unwrap().is_none());

        let check = serving.can_make_request().await;
        assert!(check.allowed, "{:?}", check.reason);
        assert!(serving.consume_request().await);
        // the drained state written back is the post-reset one
        assert_eq!(store.load().await.unwrap().unwrap().user_bucket.tokens, 0.0);
    }

    #[tokio::test]
    async fn test_reconfigured_ceiling_rederived() {
        let clock = Arc::new(ManualClock::new(T0));
        let store = Arc::new(MemoryRateLimitStore::new());
        let generous = RateLimiter::with_clock(settings(10, 1000), store.clone(), clock.clone());
        assert!(generous.consume_request().await);

        let strict = RateLimiter::with_clock(settings(3, 1000), store, clock);
        let status = strict.get_rate_limit_status().await;
        assert_eq!(status.user.capacity, 3.0);
        assert_eq!(status.user.remaining, 3.0);
        assert_eq!(status.user.refill_rate, 3.0);
    }

    #[tokio::test]
    async fn test_store_failures_degrade_to_memory() {
        let clock = Arc::new(ManualClock::new(T0));
        let limiter = RateLimiter::with_clock(settings(2, 1000), Arc::new(BrokenStore), clock);
        assert!(limiter.consume_request().await);
        assert!(limiter.consume_request().await);
        assert!(!limiter.consume_request().await);
        assert!(limiter.reset().await.is_err());
    }

    #[tokio::test]
    async fn test_reset_refills_and_deletes_document() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("rate-limit-state.json");
        let clock = Arc::new(ManualClock::new(T0));
        let limiter = RateLimiter::with_clock(
            settings(1, 1000),
            Arc::new(FileRateLimitStore::new(&path)),
            clock,
        );

        assert!(limiter.consume_request().await);
        assert!(path.exists());
        assert!(!limiter.can_make_request().await.allowed);

        limiter.reset().await.unwrap();
        assert!(!path.exists());
        assert!(limiter.can_make_request().await.allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_availability_sleeps_when_short() {
        // 20/min leaves a ~3000ms wait once drained
        let (limiter, _clock, _store) = limiter(100, 20);
        for _ in 0..20 {
            assert!(limiter.consume_request().await);
        }

        let started = tokio::time::Instant::now();
        assert!(limiter.wait_for_availability(5000).await);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(3000));
        assert!(waited <= Duration::from_millis(3001));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_availability_refuses_long_wait() {
        let (limiter, _clock, _store) = limiter(100, 20);
        for _ in 0..20 {
            assert!(limiter.consume_request().await);
        }

        let started = tokio::time::Instant::now();
        assert!(!limiter.wait_for_availability(2000).await);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_status_serializes() {
        let (limiter, _clock, _store) = limiter(10, 1000);
        let status = limiter.get_rate_limit_status().await;
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["user"]["capacity"], 10.0);
        assert_eq!(json["app"]["remaining"], 1000.0);
        assert_eq!(json["user"]["next_refill_ms"], 0);
    }
}
