//! RoomMembership port - course collaboration room participants.

use async_trait::async_trait;

use crate::domain::foundation::{CourseId, DomainError, UserId};

/// Result of adding a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomJoin {
    Added,
    AlreadyParticipant,
}

/// Port for adding buyers to their course's collaboration room.
///
/// Implementations must be idempotent: adding an existing participant
/// returns `AlreadyParticipant`, never an error.
#[async_trait]
pub trait RoomMembership: Send + Sync {
    async fn add_participant(&self, course_id: &CourseId, user_id: &UserId) -> Result<RoomJoin, DomainError>;
}
