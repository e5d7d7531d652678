//! ListEnrollmentsHandler - Query handler for a user's enrollments.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::payment::{Enrollment, PaymentError};
use crate::ports::{EnrollmentCache, EnrollmentReader};

#[derive(Debug, Clone)]
pub struct ListEnrollmentsQuery {
    pub user_id: UserId,
}

/// Read-through cache over the enrollment store. Cache failures fall
/// back to the store and are only logged.
pub struct ListEnrollmentsHandler {
    enrollments: Arc<dyn EnrollmentReader>,
    cache: Arc<dyn EnrollmentCache>,
}

impl ListEnrollmentsHandler {
    pub fn new(enrollments: Arc<dyn EnrollmentReader>, cache: Arc<dyn EnrollmentCache>) -> Self {
        Self { enrollments, cache }
    }

    pub async fn handle(&self, query: ListEnrollmentsQuery) -> Result<Vec<Enrollment>, PaymentError> {
        match self.cache.get(&query.user_id).await {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(e) => tracing::warn!(user_id = %query.user_id, error = %e, "Enrollment cache read failed"),
        }

        // Read before the ledger so a grant landing in between bumps past it.
        let generation = match self.cache.generation(&query.user_id).await {
            Ok(generation) => Some(generation),
            Err(e) => {
                tracing::warn!(user_id = %query.user_id, error = %e, "Enrollment cache generation read failed");
                None
            }
        };

        let enrollments = self.enrollments.list_for_user(&query.user_id).await?;

        if let Some(generation) = generation {
            if let Err(e) = self.cache.put(&query.user_id, generation, &enrollments).await {
                tracing::warn!(user_id = %query.user_id, error = %e, "Enrollment cache write failed");
            }
        }
        Ok(enrollments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryEnrollmentCache, InMemoryPaymentStore};
    use crate::domain::foundation::{CourseId, DomainError, PaymentId, Timestamp};
    use async_trait::async_trait;

    struct FailingCache;

    #[async_trait]
    impl EnrollmentCache for FailingCache {
        async fn get(&self, _user_id: &UserId) -> Result<Option<Vec<Enrollment>>, DomainError> {
            Err(DomainError::cache("cache down"))
        }

        async fn generation(&self, _user_id: &UserId) -> Result<u64, DomainError> {
            Err(DomainError::cache("cache down"))
        }

        async fn put(
            &self,
            _user_id: &UserId,
            _generation: u64,
            _enrollments: &[Enrollment],
        ) -> Result<(), DomainError> {
            Err(DomainError::cache("cache down"))
        }

        async fn invalidate(&self, _user_id: &UserId) -> Result<(), DomainError> {
            Err(DomainError::cache("cache down"))
        }
    }

    fn user() -> UserId {
        UserId::new("learner").unwrap()
    }

    #[tokio::test]
    async fn miss_reads_store_and_fills_cache() {
        let cache = InMemoryEnrollmentCache::new();
        let handler = ListEnrollmentsHandler::new(
            Arc::new(InMemoryPaymentStore::new()),
            Arc::new(cache.clone()),
        );

        let enrollments = handler.handle(ListEnrollmentsQuery { user_id: user() }).await.unwrap();

        assert!(enrollments.is_empty());
        assert!(cache.is_cached(&user()).await);
    }

    #[tokio::test]
    async fn hit_is_served_from_cache() {
        let cache = InMemoryEnrollmentCache::new();
        let cached = Enrollment {
            id: crate::domain::foundation::EnrollmentId::new(),
            user_id: user(),
            course_id: CourseId::new(),
            payment_id: PaymentId::new(),
            enrolled_at: Timestamp::now(),
        };
        cache.put(&user(), 0, std::slice::from_ref(&cached)).await.unwrap();
        let handler = ListEnrollmentsHandler::new(
            Arc::new(InMemoryPaymentStore::new()),
            Arc::new(cache),
        );

        let enrollments = handler.handle(ListEnrollmentsQuery { user_id: user() }).await.unwrap();

        assert_eq!(enrollments, vec![cached]);
    }

    #[tokio::test]
    async fn cache_failure_falls_back_to_store() {
        let handler = ListEnrollmentsHandler::new(
            Arc::new(InMemoryPaymentStore::new()),
            Arc::new(FailingCache),
        );

        let result = handler.handle(ListEnrollmentsQuery { user_id: user() }).await;

        assert!(result.is_ok());
    }

    /// Reader that lets a grant and its invalidation land after the
    /// handler has taken its generation but before it reads the ledger.
    struct GrantDuringRead {
        store: InMemoryPaymentStore,
        cache: InMemoryEnrollmentCache,
        granted: Enrollment,
    }

    #[async_trait]
    impl EnrollmentReader for GrantDuringRead {
        async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Enrollment>, DomainError> {
            let stale = self.store.list_for_user(user_id).await?;
            self.cache.invalidate(&self.granted.user_id).await?;
            Ok(stale)
        }

        async fn exists_for(&self, user_id: &UserId, course_id: &CourseId) -> Result<bool, DomainError> {
            self.store.exists_for(user_id, course_id).await
        }
    }

    #[tokio::test]
    async fn listing_read_before_a_grant_is_not_cached_past_invalidation() {
        let cache = InMemoryEnrollmentCache::new();
        let granted = Enrollment {
            id: crate::domain::foundation::EnrollmentId::new(),
            user_id: user(),
            course_id: CourseId::new(),
            payment_id: PaymentId::new(),
            enrolled_at: Timestamp::now(),
        };
        let handler = ListEnrollmentsHandler::new(
            Arc::new(GrantDuringRead {
                store: InMemoryPaymentStore::new(),
                cache: cache.clone(),
                granted,
            }),
            Arc::new(cache.clone()),
        );

        let stale = handler.handle(ListEnrollmentsQuery { user_id: user() }).await.unwrap();

        assert!(stale.is_empty());
        assert!(!cache.is_cached(&user()).await);
    }
}
