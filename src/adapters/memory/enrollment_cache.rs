//! In-memory and no-op enrollment caches.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::payment::Enrollment;
use crate::ports::EnrollmentCache;

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<UserId, (u64, Vec<Enrollment>)>,
    generations: HashMap<UserId, u64>,
}

impl CacheState {
    fn generation(&self, user_id: &UserId) -> u64 {
        self.generations.get(user_id).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryEnrollmentCache {
    state: Arc<RwLock<CacheState>>,
}

impl InMemoryEnrollmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when a listing would be served for the user.
    pub async fn is_cached(&self, user_id: &UserId) -> bool {
        let state = self.state.read().await;
        matches!(state.entries.get(user_id), Some((g, _)) if *g == state.generation(user_id))
    }
}

#[async_trait]
impl EnrollmentCache for InMemoryEnrollmentCache {
    async fn get(&self, user_id: &UserId) -> Result<Option<Vec<Enrollment>>, DomainError> {
        let state = self.state.read().await;
        Ok(match state.entries.get(user_id) {
            Some((g, list)) if *g == state.generation(user_id) => Some(list.clone()),
            _ => None,
        })
    }

    async fn generation(&self, user_id: &UserId) -> Result<u64, DomainError> {
        Ok(self.state.read().await.generation(user_id))
    }

    async fn put(
        &self,
        user_id: &UserId,
        generation: u64,
        enrollments: &[Enrollment],
    ) -> Result<(), DomainError> {
        self.state
            .write()
            .await
            .entries
            .insert(user_id.clone(), (generation, enrollments.to_vec()));
        Ok(())
    }

    async fn invalidate(&self, user_id: &UserId) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        *state.generations.entry(user_id.clone()).or_insert(0) += 1;
        state.entries.remove(user_id);
        Ok(())
    }
}

/// Cache that never holds anything. Used when Redis is not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEnrollmentCache;

#[async_trait]
impl EnrollmentCache for NoopEnrollmentCache {
    async fn get(&self, _user_id: &UserId) -> Result<Option<Vec<Enrollment>>, DomainError> {
        Ok(None)
    }

    async fn generation(&self, _user_id: &UserId) -> Result<u64, DomainError> {
        Ok(0)
    }

    async fn put(
        &self,
        _user_id: &UserId,
        _generation: u64,
        _enrollments: &[Enrollment],
    ) -> Result<(), DomainError> {
        Ok(())
    }

    async fn invalidate(&self, _user_id: &UserId) -> Result<(), DomainError> {
        Ok(())
    }
}
