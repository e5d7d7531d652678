//! PostgreSQL implementation of CatalogReader.
//!
//! Reads the `courses` and `users` tables owned by the catalog side of the
//! marketplace. Nothing here writes to them.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{CourseId, DomainError, UserId};
use crate::ports::{BuyerSummary, CatalogReader, CourseSummary};

pub struct PostgresCatalogReader {
    pool: PgPool,
}

impl PostgresCatalogReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogReader for PostgresCatalogReader {
    async fn find_course(&self, course_id: &CourseId) -> Result<Option<CourseSummary>, DomainError> {
        let row: Option<(Uuid, String, Decimal)> =
            sqlx::query_as("SELECT id, title, price FROM courses WHERE id = $1")
                .bind(course_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database(format!("Failed to fetch course: {}", e)))?;

        Ok(row.map(|(id, title, price)| CourseSummary {
            id: CourseId::from_uuid(id),
            title,
            price,
        }))
    }

    async fn find_buyer(&self, user_id: &UserId) -> Result<Option<BuyerSummary>, DomainError> {
        let is_verified: Option<bool> =
            sqlx::query_scalar("SELECT is_verified FROM users WHERE id = $1")
                .bind(user_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database(format!("Failed to fetch user: {}", e)))?;

        Ok(is_verified.map(|is_verified| BuyerSummary {
            id: user_id.clone(),
            is_verified,
        }))
    }
}
