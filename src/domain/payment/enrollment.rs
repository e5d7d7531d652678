//! Enrollment entity - a buyer's access grant to a course.

use crate::domain::foundation::{CourseId, EnrollmentId, PaymentId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

use super::Payment;

/// Access grant produced by a successful payment.
///
/// Unique per (user, course) and per originating payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub payment_id: PaymentId,
    pub enrolled_at: Timestamp,
}

impl Enrollment {
    /// Build the enrollment a payment grants to its buyer.
    pub fn for_payment(payment: &Payment) -> Self {
        Self {
            id: EnrollmentId::new(),
            user_id: payment.buyer_id.clone(),
            course_id: payment.course_id,
            payment_id: payment.id,
            enrolled_at: Timestamp::now(),
        }
    }
}
