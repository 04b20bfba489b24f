//! Retry and backoff policy for API requests.

use std::time::{Duration, SystemTime};

use reqwest::header::{HeaderMap, RETRY_AFTER};

use crate::error::Error;

/// How the request core retries and waits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Network attempts per request, including the first.
    pub max_attempts: u32,
    /// Backoff for attempt 0; doubles per attempt.
    pub base_delay: Duration,
    /// Longest single wait between attempts.
    pub max_backoff: Duration,
    /// Longest local rate-limit wait before failing fast.
    pub max_admission_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            max_admission_wait: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Exponential backoff: `base_delay * 2^attempt`, uncapped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor)
    }

    /// Whether `attempt` (zero-based) is the final one.
    pub fn is_last_attempt(&self, attempt: u32) -> bool {
        attempt + 1 >= self.max_attempts
    }

    /// Whether a failed attempt may be repeated.
    pub fn is_retryable(&self, error: &Error) -> bool {
        error.is_transient()
    }

    /// Wait before retrying a 429.
    ///
    /// A `Retry-After` header wins over exponential backoff. The result is
    /// not capped; see [`within_cap`](Self::within_cap).
    pub fn rate_limit_wait(&self, attempt: u32, headers: &HeaderMap) -> Duration {
        retry_after(headers, SystemTime::now()).unwrap_or_else(|| self.backoff(attempt))
    }

    /// Whether a wait is short enough to sit out.
    pub fn within_cap(&self, wait: Duration) -> bool {
        wait <= self.max_backoff
    }

    /// Wait before retrying a transient failure.
    pub fn transient_wait(&self, attempt: u32) -> Duration {
        self.backoff(attempt).min(self.max_backoff)
    }
}

/// Whole milliseconds in `wait`, saturating at `u64::MAX`.
pub fn duration_ms(wait: Duration) -> u64 {
    u64::try_from(wait.as_millis()).unwrap_or(u64::MAX)
}

/// Parse `Retry-After` as delta-seconds or an HTTP date.
pub fn retry_after(headers: &HeaderMap, now: SystemTime) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

    if let Ok(seconds) = raw.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let at = chrono::DateTime::parse_from_rfc2822(raw).ok()?;
    let at = SystemTime::from(at.with_timezone(&chrono::Utc));
    Some(at.duration_since(now).unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(4), Duration::from_secs(16));
        assert_eq!(policy.transient_wait(10), Duration::from_secs(30));
    }

    #[test]
    fn test_last_attempt() {
        let policy = RetryPolicy::default();
        assert!(!policy.is_last_attempt(1));
        assert!(policy.is_last_attempt(2));
        assert!(RetryPolicy::default().with_max_attempts(0).is_last_attempt(0));
    }

    #[test]
    fn test_retry_after_seconds() {
        assert_eq!(
            retry_after(&headers("7"), SystemTime::now()),
            Some(Duration::from_secs(7))
        );
        assert_eq!(retry_after(&HeaderMap::new(), SystemTime::now()), None);
        assert_eq!(retry_after(&headers("soon"), SystemTime::now()), None);
    }

    #[test]
    fn test_retry_after_http_date() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_445_412_470);
        // 10 seconds after `now`
        let wait = retry_after(&headers("Wed, 21 Oct 2015 07:28:00 GMT"), now);
        assert_eq!(wait, Some(Duration::from_secs(10)));

        let later = now + Duration::from_secs(60);
        let wait = retry_after(&headers("Wed, 21 Oct 2015 07:28:00 GMT"), later);
        assert_eq!(wait, Some(Duration::ZERO));
    }

    #[test]
    fn test_rate_limit_wait_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.rate_limit_wait(0, &HeaderMap::new()),
            Duration::from_secs(1)
        );
        assert_eq!(
            policy.rate_limit_wait(0, &headers("12")),
            Duration::from_secs(12)
        );
        assert!(policy.within_cap(policy.rate_limit_wait(0, &headers("12"))));
        assert!(!policy.within_cap(policy.rate_limit_wait(0, &headers("31"))));
        assert!(!policy.within_cap(policy.rate_limit_wait(5, &HeaderMap::new())));
    }

    #[test]
    fn test_duration_ms_saturates() {
        assert_eq!(duration_ms(Duration::from_millis(1500)), 1500);
        assert_eq!(duration_ms(Duration::from_secs(u64::MAX)), u64::MAX);
        assert_eq!(duration_ms(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_retryable() {
        let policy = RetryPolicy::default();
        assert!(policy.is_retryable(&Error::api(500, "boom")));
        assert!(!policy.is_retryable(&Error::api(404, "missing")));
    }
}
