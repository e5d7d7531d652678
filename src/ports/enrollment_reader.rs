//! EnrollmentReader port - read access to enrollment grants.
//!
//! Enrollments are written only by fulfillment, inside
//! `PaymentRepository::settle`.

use async_trait::async_trait;

use crate::domain::foundation::{CourseId, DomainError, UserId};
use crate::domain::payment::Enrollment;

#[async_trait]
pub trait EnrollmentReader: Send + Sync {
    /// Returns true if the user holds an enrollment for the course.
    async fn exists_for(&self, user_id: &UserId, course_id: &CourseId) -> Result<bool, DomainError>;

    /// All enrollments of a user, newest first.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Enrollment>, DomainError>;
}
