//! Payment aggregate entity.
//!
//! A Payment is one purchase attempt of one course by one buyer. The
//! ledger of payments is the source of truth for "has this user paid
//! for this course".
//!
//! # Design Decisions
//!
//! - **Insert once**: a row is written only by initiation; every later
//!   change is a status update
//! - **Decimal money**: amounts are `rust_decimal::Decimal` in the
//!   catalog's currency, never floats
//! - **Terminal is final**: once settled, a payment never changes again

use crate::domain::foundation::{
    CourseId, DomainError, PaymentId, StateMachine, Timestamp, UserId, ValidationError,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{PaymentMethod, PaymentStatus};

/// Payment aggregate - one purchase attempt.
///
/// # Invariants
///
/// - `amount` is strictly positive
/// - `transaction_ref` is set only when `status` is `Successful`
/// - Status transitions follow the `PaymentStatus` state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub buyer_id: UserId,
    pub course_id: CourseId,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub method: PaymentMethod,

    /// Provider reference for the settled charge (e.g. checkout session id).
    pub transaction_ref: Option<String>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Payment {
    /// Start a new purchase attempt in `Pending`.
    ///
    /// # Errors
    ///
    /// Returns error if `amount` is zero or negative.
    pub fn initiate(
        buyer_id: UserId,
        course_id: CourseId,
        amount: Decimal,
        method: PaymentMethod,
    ) -> Result<Self, ValidationError> {
        if amount <= Decimal::ZERO {
            return Err(ValidationError::not_positive("amount"));
        }
        let now = Timestamp::now();
        Ok(Self {
            id: PaymentId::new(),
            buyer_id,
            course_id,
            amount,
            status: PaymentStatus::Pending,
            method,
            transaction_ref: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns true if `user_id` made this purchase.
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.buyer_id == user_id
    }

    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }

    /// Settle as paid, recording the provider's transaction reference.
    ///
    /// # Errors
    ///
    /// Returns error if the payment is no longer pending.
    pub fn mark_successful(&mut self, transaction_ref: impl Into<String>) -> Result<(), DomainError> {
        self.status = self.status.transition_to(PaymentStatus::Successful)?;
        self.transaction_ref = Some(transaction_ref.into());
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Settle as failed.
    ///
    /// # Errors
    ///
    /// Returns error if the payment is no longer pending.
    pub fn mark_failed(&mut self) -> Result<(), DomainError> {
        self.status = self.status.transition_to(PaymentStatus::Failed)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Cancel on the buyer's request.
    ///
    /// # Errors
    ///
    /// Returns error if the payment is no longer pending.
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        self.status = self.status.transition_to(PaymentStatus::Cancelled)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }
}
