//! Client-side rate limiting with a persisted dual token bucket.

pub mod bucket;
pub mod clock;
pub mod limiter;
pub mod store;

pub use bucket::RateLimitBucket;
pub use clock::{Clock, ManualClock, SystemClock};
pub use limiter::{BucketStatus, RateLimitCheck, RateLimitStatus, RateLimiter, STALE_AFTER_MS};
pub use store::{
    FileRateLimitStore, MemoryRateLimitStore, RateLimitState, RateLimitStore, SharedRateLimitStore,
};
