//! PostgreSQL implementation of EnrollmentReader.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{CourseId, DomainError, EnrollmentId, PaymentId, Timestamp, UserId};
use crate::domain::payment::Enrollment;
use crate::ports::EnrollmentReader;

pub struct PostgresEnrollmentReader {
    pool: PgPool,
}

impl PostgresEnrollmentReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EnrollmentRow {
    id: Uuid,
    user_id: String,
    course_id: Uuid,
    payment_id: Uuid,
    enrolled_at: DateTime<Utc>,
}

impl TryFrom<EnrollmentRow> for Enrollment {
    type Error = DomainError;

    fn try_from(row: EnrollmentRow) -> Result<Self, Self::Error> {
        Ok(Enrollment {
            id: EnrollmentId::from_uuid(row.id),
            user_id: UserId::new(row.user_id)
                .map_err(|e| DomainError::database(format!("Invalid user_id: {}", e)))?,
            course_id: CourseId::from_uuid(row.course_id),
            payment_id: PaymentId::from_uuid(row.payment_id),
            enrolled_at: Timestamp::from_datetime(row.enrolled_at),
        })
    }
}

#[async_trait]
impl EnrollmentReader for PostgresEnrollmentReader {
    async fn exists_for(&self, user_id: &UserId, course_id: &CourseId) -> Result<bool, DomainError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM enrollments WHERE user_id = $1 AND course_id = $2)",
        )
        .bind(user_id.as_str())
        .bind(course_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to check enrollment: {}", e)))?;

        Ok(exists)
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Enrollment>, DomainError> {
        let rows: Vec<EnrollmentRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, course_id, payment_id, enrolled_at
            FROM enrollments
            WHERE user_id = $1
            ORDER BY enrolled_at DESC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list enrollments: {}", e)))?;

        rows.into_iter().map(Enrollment::try_from).collect()
    }
}
