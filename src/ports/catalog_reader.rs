//! CatalogReader port - read-only lookups into course and user data.
//!
//! Courses and users are owned by the CRUD side of the marketplace; the
//! payment subsystem only reads prices and eligibility.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CourseId, DomainError, UserId};

/// Purchase-relevant view of a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSummary {
    pub id: CourseId,
    pub title: String,
    pub price: Decimal,
}

/// Purchase-relevant view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerSummary {
    pub id: UserId,
    pub is_verified: bool,
}

#[async_trait]
pub trait CatalogReader: Send + Sync {
    async fn find_course(&self, course_id: &CourseId) -> Result<Option<CourseSummary>, DomainError>;

    async fn find_buyer(&self, user_id: &UserId) -> Result<Option<BuyerSummary>, DomainError>;
}
