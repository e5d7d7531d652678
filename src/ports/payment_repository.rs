//! PaymentRepository port - the payment ledger.
//!
//! Writes to a payment row go through `settle`, a compare-and-set
//! guarded by `status = pending`. Initiation, fulfillment and
//! cancellation all use it, so the first writer wins and every later
//! writer sees `NotPending`.

use async_trait::async_trait;

use crate::domain::foundation::{CourseId, DomainError, PaymentId, UserId};
use crate::domain::payment::{Enrollment, Payment, PaymentStatus};

use super::ProcessedEvent;

/// A single atomic status change for a pending payment.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub payment_id: PaymentId,
    pub target: PaymentStatus,

    /// Provider reference recorded with a successful charge.
    pub transaction_ref: Option<String>,

    /// Enrollment created in the same unit of work.
    pub grant: Option<Enrollment>,

    /// Gateway event recorded in the same unit of work.
    pub processed_event: Option<ProcessedEvent>,
}

impl Settlement {
    /// Settle as paid: status, reference, enrollment and event in one unit.
    pub fn success(
        payment_id: PaymentId,
        transaction_ref: impl Into<String>,
        grant: Enrollment,
        processed_event: ProcessedEvent,
    ) -> Self {
        Self {
            payment_id,
            target: PaymentStatus::Successful,
            transaction_ref: Some(transaction_ref.into()),
            grant: Some(grant),
            processed_event: Some(processed_event),
        }
    }

    pub fn failure(payment_id: PaymentId, processed_event: ProcessedEvent) -> Self {
        Self {
            payment_id,
            target: PaymentStatus::Failed,
            transaction_ref: None,
            grant: None,
            processed_event: Some(processed_event),
        }
    }

    pub fn cancellation(payment_id: PaymentId) -> Self {
        Self {
            payment_id,
            target: PaymentStatus::Cancelled,
            transaction_ref: None,
            grant: None,
            processed_event: None,
        }
    }
}

/// Result of a compare-and-set settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleOutcome {
    /// The payment was pending and now carries the target status.
    Applied(Payment),

    /// The payment had already left pending. Nothing was written.
    NotPending(Payment),

    /// No payment with that id.
    NotFound,
}

/// Port for the payment ledger.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Insert a new pending payment.
    ///
    /// # Errors
    ///
    /// - `PaymentPending` code if the buyer already has a pending payment for the course
    /// - `AlreadyPurchased` code if the buyer already paid for the course
    /// - `DatabaseError` on storage failure
    async fn insert(&self, payment: &Payment) -> Result<(), DomainError>;

    /// Find a payment by id.
    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError>;

    /// Find the payment blocking a new attempt for (buyer, course).
    ///
    /// Returns the successful payment if one exists, else the pending one.
    async fn find_open_for(
        &self,
        buyer_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<Payment>, DomainError>;

    /// All payments of a buyer, newest first.
    async fn list_by_buyer(&self, buyer_id: &UserId) -> Result<Vec<Payment>, DomainError>;

    /// Apply a settlement atomically if, and only if, the payment is pending.
    async fn settle(&self, settlement: Settlement) -> Result<SettleOutcome, DomainError>;
}
