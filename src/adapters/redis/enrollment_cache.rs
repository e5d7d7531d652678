//! Redis-backed enrollment cache.
//!
//! Each user's listing is a JSON string under `enrollments:<user_id>` with
//! a fixed TTL, tagged with the generation it was read under. The
//! generation counter lives at `enrollments:gen:<user_id>`; invalidation
//! increments it and deletes the listing in one MULTI block.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::payment::Enrollment;
use crate::ports::EnrollmentCache;

const KEY_PREFIX: &str = "enrollments";

#[derive(Clone)]
pub struct RedisEnrollmentCache {
    conn: MultiplexedConnection,
    ttl_secs: u64,
}

impl RedisEnrollmentCache {
    pub fn new(conn: MultiplexedConnection, ttl_secs: u64) -> Self {
        Self { conn, ttl_secs }
    }

    /// Generation keys outlive any listing written after their last bump.
    fn generation_ttl_secs(&self) -> u64 {
        self.ttl_secs.saturating_mul(2)
    }
}

#[derive(Serialize)]
struct ListingOut<'a> {
    generation: u64,
    enrollments: &'a [Enrollment],
}

#[derive(Deserialize)]
struct ListingIn {
    generation: u64,
    enrollments: Vec<Enrollment>,
}

fn cache_key(user_id: &UserId) -> String {
    format!("{}:{}", KEY_PREFIX, user_id)
}

fn generation_key(user_id: &UserId) -> String {
    format!("{}:gen:{}", KEY_PREFIX, user_id)
}

fn cache_error(e: impl std::fmt::Display) -> DomainError {
    DomainError::cache(e.to_string())
}

/// Decodes a stored listing, serving it only under the current generation.
fn current_listing(raw: Option<String>, generation: u64) -> Option<Vec<Enrollment>> {
    let listing: ListingIn = match serde_json::from_str(&raw?) {
        Ok(listing) => listing,
        Err(e) => {
            // Older shape; treat as a miss
            tracing::debug!(error = %e, "Discarding undecodable cache entry");
            return None;
        }
    };
    (listing.generation == generation).then_some(listing.enrollments)
}

#[async_trait]
impl EnrollmentCache for RedisEnrollmentCache {
    async fn get(&self, user_id: &UserId) -> Result<Option<Vec<Enrollment>>, DomainError> {
        let mut conn = self.conn.clone();
        let (raw, generation): (Option<String>, Option<u64>) = redis::cmd("MGET")
            .arg(cache_key(user_id))
            .arg(generation_key(user_id))
            .query_async(&mut conn)
            .await
            .map_err(|e: redis::RedisError| cache_error(e))?;

        Ok(current_listing(raw, generation.unwrap_or(0)))
    }

    async fn generation(&self, user_id: &UserId) -> Result<u64, DomainError> {
        let mut conn = self.conn.clone();
        let generation: Option<u64> = redis::cmd("GET")
            .arg(generation_key(user_id))
            .query_async(&mut conn)
            .await
            .map_err(|e: redis::RedisError| cache_error(e))?;
        Ok(generation.unwrap_or(0))
    }

    async fn put(
        &self,
        user_id: &UserId,
        generation: u64,
        enrollments: &[Enrollment],
    ) -> Result<(), DomainError> {
        let json = serde_json::to_string(&ListingOut {
            generation,
            enrollments,
        })
        .map_err(cache_error)?;
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(cache_key(user_id))
            .arg(json)
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e: redis::RedisError| cache_error(e))
    }

    async fn invalidate(&self, user_id: &UserId) -> Result<(), DomainError> {
        let generation = generation_key(user_id);
        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .cmd("INCR")
            .arg(&generation)
            .ignore()
            .cmd("EXPIRE")
            .arg(&generation)
            .arg(self.generation_ttl_secs())
            .ignore()
            .cmd("DEL")
            .arg(cache_key(user_id))
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e: redis::RedisError| cache_error(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;

    #[test]
    fn keys_are_namespaced_per_user() {
        let user = UserId::new("learner-42").unwrap();
        assert_eq!(cache_key(&user), "enrollments:learner-42");
    }

    #[test]
    fn generation_key_is_separate_from_listing_key() {
        let user = UserId::new("learner-42").unwrap();
        assert_eq!(generation_key(&user), "enrollments:gen:learner-42");
    }

    #[test]
    fn listing_from_an_older_generation_is_a_miss() {
        let raw = serde_json::to_string(&ListingOut {
            generation: 3,
            enrollments: &[],
        })
        .unwrap();

        assert_eq!(current_listing(Some(raw.clone()), 3), Some(vec![]));
        assert_eq!(current_listing(Some(raw), 4), None);
        assert_eq!(current_listing(None, 0), None);
    }

    #[test]
    fn undecodable_listing_is_a_miss() {
        assert_eq!(current_listing(Some("[]".to_string()), 0), None);
    }

    #[test]
    fn cache_errors_use_cache_code() {
        assert_eq!(cache_error("connection refused").code, ErrorCode::CacheError);
    }

    // Round trips against a live server need a running Redis instance:
    //
    // #[tokio::test]
    // #[ignore]
    // async fn put_then_get_returns_enrollments() {
    //     let client = redis::Client::open("redis://127.0.0.1/").unwrap();
    //     let conn = client.get_multiplexed_tokio_connection().await.unwrap();
    //     let cache = RedisEnrollmentCache::new(conn, 60);
    //     ...
    // }
}
