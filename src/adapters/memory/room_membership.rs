//! In-memory course room membership.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{CourseId, DomainError, ErrorCode, UserId};
use crate::ports::{RoomJoin, RoomMembership};

#[derive(Debug, Clone, Default)]
pub struct InMemoryRoomMembership {
    rooms: Arc<RwLock<HashMap<CourseId, HashSet<UserId>>>>,
    failures_remaining: Arc<AtomicU32>,
}

impl InMemoryRoomMembership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` calls with an infrastructure error.
    pub fn failing_next(self, count: u32) -> Self {
        self.failures_remaining.store(count, Ordering::SeqCst);
        self
    }

    pub async fn participants(&self, course_id: &CourseId) -> HashSet<UserId> {
        self.rooms
            .read()
            .await
            .get(course_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl RoomMembership for InMemoryRoomMembership {
    async fn add_participant(&self, course_id: &CourseId, user_id: &UserId) -> Result<RoomJoin, DomainError> {
        let should_fail = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(DomainError::new(ErrorCode::InternalError, "room registry unavailable"));
        }

        let mut rooms = self.rooms.write().await;
        let inserted = rooms.entry(*course_id).or_default().insert(user_id.clone());
        Ok(if inserted {
            RoomJoin::Added
        } else {
            RoomJoin::AlreadyParticipant
        })
    }
}
