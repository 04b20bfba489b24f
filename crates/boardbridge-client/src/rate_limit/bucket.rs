//! A single continuously refilling token bucket.

use serde::{Deserialize, Serialize};

/// Token bucket state. Timestamps are Unix epoch milliseconds.
///
/// `0 <= tokens <= capacity` holds after every operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitBucket {
    pub capacity: f64,
    pub tokens: f64,
    /// Tokens added per second.
    pub refill_rate: f64,
    pub last_refill: u64,
    /// Time to refill from empty to full.
    pub refill_interval_ms: u64,
}

impl RateLimitBucket {
    /// A full bucket allowing `capacity` operations per `refill_interval_ms`.
    pub fn new(capacity: u32, refill_interval_ms: u64, now_ms: u64) -> Self {
        let capacity = f64::from(capacity);
        Self {
            capacity,
            tokens: capacity,
            refill_rate: capacity * 1000.0 / refill_interval_ms as f64,
            last_refill: now_ms,
            refill_interval_ms,
        }
    }

    /// Add tokens for the time elapsed since the last refill.
    ///
    /// `last_refill` always advances to `now_ms`, even when the bucket is
    /// already full, so repeated checks never compound rounding error.
    pub fn refill(&mut self, now_ms: u64) {
        let elapsed_ms = now_ms.saturating_sub(self.last_refill);
        if elapsed_ms > 0 {
            let added = elapsed_ms as f64 / 1000.0 * self.refill_rate;
            self.tokens = (self.tokens + added).min(self.capacity);
        }
        self.last_refill = now_ms;
        self.tokens = self.tokens.clamp(0.0, self.capacity);
    }

    /// Whether one whole token is available.
    pub fn has_token(&self) -> bool {
        self.tokens >= 1.0
    }

    /// Take one token. Refused, never clamped, when fewer than one remain.
    pub fn try_consume(&mut self) -> bool {
        if self.has_token() {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Milliseconds until one token is available, rounded up.
    pub fn wait_time_ms(&self) -> u64 {
        if self.has_token() || self.refill_rate <= 0.0 {
            return 0;
        }
        let needed = 1.0 - self.tokens;
        (needed / self.refill_rate * 1000.0).ceil() as u64
    }

    /// Milliseconds until the whole-token count next increases.
    pub fn next_refill_ms(&self) -> u64 {
        if self.tokens >= self.capacity || self.refill_rate <= 0.0 {
            return 0;
        }
        let target = (self.tokens.floor() + 1.0).min(self.capacity);
        ((target - self.tokens) / self.refill_rate * 1000.0).ceil() as u64
    }

    /// Whether this bucket was built from the given ceiling.
    pub fn matches(&self, capacity: u32, refill_interval_ms: u64) -> bool {
        self.capacity == f64::from(capacity) && self.refill_interval_ms == refill_interval_ms
    }

    /// Rebuild capacity and rate for a new ceiling, keeping the current fill.
    pub fn reconfigure(&mut self, capacity: u32, refill_interval_ms: u64) {
        let fresh = Self::new(capacity, refill_interval_ms, self.last_refill);
        self.capacity = fresh.capacity;
        self.refill_rate = fresh.refill_rate;
        self.refill_interval_ms = refill_interval_ms;
        self.tokens = self.tokens.clamp(0.0, self.capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_bucket_is_full() {
        let bucket = RateLimitBucket::new(10, 1000, 0);
        assert_eq!(bucket.tokens, 10.0);
        assert_eq!(bucket.refill_rate, 10.0);

        let per_minute = RateLimitBucket::new(1000, 60_000, 0);
        assert!((per_minute.refill_rate - 1000.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_refill_adds_elapsed_times_rate() {
        let mut bucket = RateLimitBucket::new(10, 1000, 0);
        for _ in 0..10 {
            assert!(bucket.try_consume());
        }
        assert_eq!(bucket.tokens, 0.0);

        bucket.refill(250);
        assert_eq!(bucket.tokens, 2.5);
        assert_eq!(bucket.last_refill, 250);
    }

    #[test]
    fn test_refill_clamps_to_capacity() {
        let mut bucket = RateLimitBucket::new(5, 1000, 0);
        bucket.try_consume();
        bucket.refill(60_000);
        assert_eq!(bucket.tokens, 5.0);
    }

    #[test]
    fn test_refill_advances_when_full() {
        let mut bucket = RateLimitBucket::new(5, 1000, 0);
        bucket.refill(700);
        assert_eq!(bucket.last_refill, 700);
        assert_eq!(bucket.tokens, 5.0);
    }

    #[test]
    fn test_refill_ignores_clock_going_backwards() {
        let mut bucket = RateLimitBucket::new(2, 1000, 1000);
        bucket.try_consume();
        bucket.refill(500);
        assert_eq!(bucket.tokens, 1.0);
        assert_eq!(bucket.last_refill, 500);
    }

    #[test]
    fn test_consume_refused_below_one() {
        let mut bucket = RateLimitBucket::new(1, 1000, 0);
        assert!(bucket.try_consume());
        bucket.refill(500);
        assert_eq!(bucket.tokens, 0.5);
        assert!(!bucket.try_consume());
        assert_eq!(bucket.tokens, 0.5);
    }

    #[test]
    fn test_wait_time_rounds_up() {
        let mut bucket = RateLimitBucket::new(3, 1000, 0);
        for _ in 0..3 {
            bucket.try_consume();
        }
        // 1 token at 3 tokens/sec is 333.33ms
        assert_eq!(bucket.wait_time_ms(), 334);

        bucket.refill(100);
        assert_eq!(bucket.wait_time_ms(), 234);
    }

    #[test]
    fn test_next_refill() {
        let mut bucket = RateLimitBucket::new(10, 1000, 0);
        assert_eq!(bucket.next_refill_ms(), 0);
        bucket.tokens = 4.5;
        assert_eq!(bucket.next_refill_ms(), 50);
    }

    #[test]
    fn test_reconfigure_clamps_tokens() {
        let mut bucket = RateLimitBucket::new(10, 1000, 0);
        assert!(!bucket.matches(4, 1000));
        bucket.reconfigure(4, 1000);
        assert!(bucket.matches(4, 1000));
        assert_eq!(bucket.tokens, 4.0);
        assert_eq!(bucket.refill_rate, 4.0);
    }

    #[test]
    fn test_serialized_field_names() {
        let bucket = RateLimitBucket::new(2, 1000, 42);
        let json = serde_json::to_value(&bucket).unwrap();
        assert_eq!(json["refillRate"], 2.0);
        assert_eq!(json["lastRefill"], 42);
        assert_eq!(json["refillIntervalMs"], 1000);
    }
}
