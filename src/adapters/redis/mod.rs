//! Redis adapters.
//!
//! - `RedisEnrollmentCache` - Per-user enrollment listings with a TTL

mod enrollment_cache;

pub use enrollment_cache::RedisEnrollmentCache;
