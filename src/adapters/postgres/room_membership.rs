//! PostgreSQL implementation of RoomMembership.
//!
//! The realtime transport reads `course_room_participants` when a user
//! joins a course room; this adapter only maintains the rows.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{CourseId, DomainError, UserId};
use crate::ports::{RoomJoin, RoomMembership};

pub struct PostgresRoomMembership {
    pool: PgPool,
}

impl PostgresRoomMembership {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomMembership for PostgresRoomMembership {
    async fn add_participant(&self, course_id: &CourseId, user_id: &UserId) -> Result<RoomJoin, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO course_room_participants (course_id, user_id, joined_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (course_id, user_id) DO NOTHING
            "#,
        )
        .bind(course_id.as_uuid())
        .bind(user_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to add room participant: {}", e)))?;

        Ok(if result.rows_affected() == 1 {
            RoomJoin::Added
        } else {
            RoomJoin::AlreadyParticipant
        })
    }
}
