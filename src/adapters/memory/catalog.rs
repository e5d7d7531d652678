//! In-memory course and buyer catalog.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{CourseId, DomainError, UserId};
use crate::ports::{BuyerSummary, CatalogReader, CourseSummary};

#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    courses: Arc<RwLock<HashMap<CourseId, CourseSummary>>>,
    buyers: Arc<RwLock<HashMap<UserId, BuyerSummary>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a course and return its id.
    pub async fn add_course(&self, title: impl Into<String>, price: Decimal) -> CourseId {
        let course = CourseSummary {
            id: CourseId::new(),
            title: title.into(),
            price,
        };
        let id = course.id;
        self.courses.write().await.insert(id, course);
        id
    }

    pub async fn add_buyer(&self, user_id: UserId, is_verified: bool) {
        self.buyers.write().await.insert(
            user_id.clone(),
            BuyerSummary {
                id: user_id,
                is_verified,
            },
        );
    }
}

#[async_trait]
impl CatalogReader for InMemoryCatalog {
    async fn find_course(&self, course_id: &CourseId) -> Result<Option<CourseSummary>, DomainError> {
        Ok(self.courses.read().await.get(course_id).cloned())
    }

    async fn find_buyer(&self, user_id: &UserId) -> Result<Option<BuyerSummary>, DomainError> {
        Ok(self.buyers.read().await.get(user_id).cloned())
    }
}
