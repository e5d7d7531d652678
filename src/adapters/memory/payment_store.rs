//! In-memory payment ledger, enrollment table and processed-event ledger.
//!
//! All three live behind one lock so `settle` is atomic the same way a
//! database transaction is.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{CourseId, DomainError, ErrorCode, PaymentId, Timestamp, UserId};
use crate::domain::payment::{Enrollment, Payment, PaymentStatus};
use crate::ports::{
    EnrollmentReader, PaymentRepository, ProcessedEvent, ProcessedEventLedger, SaveResult,
    SettleOutcome, Settlement,
};

#[derive(Debug, Default)]
struct LedgerState {
    payments: HashMap<PaymentId, Payment>,
    enrollments: Vec<Enrollment>,
    processed: HashMap<String, ProcessedEvent>,
}

impl LedgerState {
    fn record_event(&mut self, event: ProcessedEvent) -> SaveResult {
        if self.processed.contains_key(&event.event_key) {
            SaveResult::AlreadyExists
        } else {
            self.processed.insert(event.event_key.clone(), event);
            SaveResult::Inserted
        }
    }

    fn grant(&mut self, enrollment: Enrollment) {
        let duplicate = self.enrollments.iter().any(|e| {
            (e.user_id == enrollment.user_id && e.course_id == enrollment.course_id)
                || e.payment_id == enrollment.payment_id
        });
        if !duplicate {
            self.enrollments.push(enrollment);
        }
    }
}

/// In-memory ledger implementing the payment, enrollment and
/// processed-event ports.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentStore {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of enrollment rows (useful for tests).
    pub async fn enrollment_count(&self) -> usize {
        self.state.read().await.enrollments.len()
    }

    /// Number of recorded gateway events (useful for tests).
    pub async fn processed_count(&self) -> usize {
        self.state.read().await.processed.len()
    }

    /// Recorded gateway event by ledger key (useful for tests).
    pub async fn processed_event(&self, event_key: &str) -> Option<ProcessedEvent> {
        self.state.read().await.processed.get(event_key).cloned()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentStore {
    async fn insert(&self, payment: &Payment) -> Result<(), DomainError> {
        let mut state = self.state.write().await;

        let blocking = state.payments.values().find(|p| {
            p.buyer_id == payment.buyer_id
                && p.course_id == payment.course_id
                && matches!(p.status, PaymentStatus::Pending | PaymentStatus::Successful)
        });
        if let Some(existing) = blocking {
            let code = match existing.status {
                PaymentStatus::Successful => ErrorCode::AlreadyPurchased,
                _ => ErrorCode::PaymentPending,
            };
            return Err(DomainError::new(code, "payment already open for buyer and course"));
        }
        if state.payments.contains_key(&payment.id) {
            return Err(DomainError::database(format!("duplicate payment id {}", payment.id)));
        }

        state.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        Ok(self.state.read().await.payments.get(id).cloned())
    }

    async fn find_open_for(
        &self,
        buyer_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<Payment>, DomainError> {
        let state = self.state.read().await;
        let mut open: Vec<&Payment> = state
            .payments
            .values()
            .filter(|p| &p.buyer_id == buyer_id && &p.course_id == course_id)
            .filter(|p| matches!(p.status, PaymentStatus::Pending | PaymentStatus::Successful))
            .collect();
        open.sort_by_key(|p| p.status != PaymentStatus::Successful);
        Ok(open.first().map(|p| (*p).clone()))
    }

    async fn list_by_buyer(&self, buyer_id: &UserId) -> Result<Vec<Payment>, DomainError> {
        let state = self.state.read().await;
        let mut payments: Vec<Payment> = state
            .payments
            .values()
            .filter(|p| &p.buyer_id == buyer_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }

    async fn settle(&self, settlement: Settlement) -> Result<SettleOutcome, DomainError> {
        let mut state = self.state.write().await;

        let Some(current) = state.payments.get(&settlement.payment_id) else {
            return Ok(SettleOutcome::NotFound);
        };
        if current.status != PaymentStatus::Pending {
            return Ok(SettleOutcome::NotPending(current.clone()));
        }

        let mut payment = current.clone();
        match settlement.target {
            PaymentStatus::Successful => {
                payment.mark_successful(settlement.transaction_ref.unwrap_or_default())?
            }
            PaymentStatus::Failed => payment.mark_failed()?,
            PaymentStatus::Cancelled => payment.cancel()?,
            PaymentStatus::Pending => {
                return Err(DomainError::new(
                    ErrorCode::InvalidStateTransition,
                    "cannot settle a payment into pending",
                ))
            }
        }

        state.payments.insert(payment.id, payment.clone());
        if let Some(enrollment) = settlement.grant {
            state.grant(enrollment);
        }
        if let Some(event) = settlement.processed_event {
            state.record_event(event);
        }
        Ok(SettleOutcome::Applied(payment))
    }
}

#[async_trait]
impl EnrollmentReader for InMemoryPaymentStore {
    async fn exists_for(&self, user_id: &UserId, course_id: &CourseId) -> Result<bool, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .enrollments
            .iter()
            .any(|e| &e.user_id == user_id && &e.course_id == course_id))
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Enrollment>, DomainError> {
        let state = self.state.read().await;
        let mut enrollments: Vec<Enrollment> = state
            .enrollments
            .iter()
            .filter(|e| &e.user_id == user_id)
            .cloned()
            .collect();
        enrollments.sort_by(|a, b| b.enrolled_at.cmp(&a.enrolled_at));
        Ok(enrollments)
    }
}

#[async_trait]
impl ProcessedEventLedger for InMemoryPaymentStore {
    async fn contains(&self, event_key: &str) -> Result<bool, DomainError> {
        Ok(self.state.read().await.processed.contains_key(event_key))
    }

    async fn record(&self, event: ProcessedEvent) -> Result<SaveResult, DomainError> {
        Ok(self.state.write().await.record_event(event))
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let mut state = self.state.write().await;
        let before = state.processed.len();
        state.processed.retain(|_, e| !e.processed_at.is_before(&cutoff));
        Ok((before - state.processed.len()) as u64)
    }
}
