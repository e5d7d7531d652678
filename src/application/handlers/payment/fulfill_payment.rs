//! FulfillmentOrchestrator - applies the business effect of a verified gateway event.
//!
//! Durable effects (payment status, enrollment, processed-event record) are
//! written in one `settle` call. Room membership and cache invalidation run
//! afterwards and never fail the event: a missing room participant is
//! repaired on the next join, a missing enrollment is not.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::foundation::{CourseId, DomainError, PaymentId, UserId};
use crate::domain::payment::{Enrollment, Payment, PaymentStatus};
use crate::domain::webhook::{GatewayEvent, GatewayEventKind, WebhookError};
use crate::ports::{
    EnrollmentCache, PaymentRepository, ProcessedEvent, ProcessedEventLedger, RoomJoin,
    RoomMembership, SettleOutcome, Settlement,
};

const ROOM_JOIN_ATTEMPTS: u32 = 3;
const ROOM_JOIN_BACKOFF: Duration = Duration::from_millis(50);

/// What fulfillment did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FulfillmentOutcome {
    /// Payment settled as successful and the buyer was enrolled.
    Fulfilled {
        payment_id: PaymentId,
        buyer_id: UserId,
    },

    /// Payment settled as failed.
    MarkedFailed { payment_id: PaymentId },

    /// Event id already in the processed ledger.
    AlreadyProcessed,

    /// Payment was already in the state the event asks for, or left
    /// pending before this event arrived.
    AlreadySettled { payment_id: PaymentId },

    /// Event contradicts the ledger. Logged, nothing mutated.
    Anomaly { payment_id: PaymentId },

    /// No payment with the referenced id.
    PaymentNotFound { payment_id: PaymentId },

    /// Event type this service does not act on.
    Unhandled,
}

pub struct FulfillmentOrchestrator {
    payments: Arc<dyn PaymentRepository>,
    ledger: Arc<dyn ProcessedEventLedger>,
    rooms: Arc<dyn RoomMembership>,
    cache: Arc<dyn EnrollmentCache>,
}

impl FulfillmentOrchestrator {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        ledger: Arc<dyn ProcessedEventLedger>,
        rooms: Arc<dyn RoomMembership>,
        cache: Arc<dyn EnrollmentCache>,
    ) -> Self {
        Self {
            payments,
            ledger,
            rooms,
            cache,
        }
    }

    /// Apply a verified event at most once.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::Database` when storage fails. The caller
    /// should let the gateway redeliver; the ledger makes that safe.
    pub async fn apply(&self, event: GatewayEvent) -> Result<FulfillmentOutcome, WebhookError> {
        let key = event.ledger_key();
        if self.ledger.contains(&key).await.map_err(storage)? {
            tracing::debug!(event_key = %key, "Duplicate gateway event skipped");
            return Ok(FulfillmentOutcome::AlreadyProcessed);
        }

        match event.kind.clone() {
            GatewayEventKind::CheckoutCompleted {
                payment_id,
                buyer_id,
                transaction_ref,
            } => {
                self.apply_success(&event, payment_id, buyer_id, transaction_ref)
                    .await
            }
            GatewayEventKind::PaymentFailed { payment_id } => {
                self.apply_failure(&event, payment_id).await
            }
            GatewayEventKind::Unhandled => {
                tracing::warn!(
                    event_key = %key,
                    event_type = %event.event_type,
                    "Unhandled gateway event type acknowledged"
                );
                self.record(ProcessedEvent::ignored(&event, "unhandled event type"))
                    .await;
                Ok(FulfillmentOutcome::Unhandled)
            }
        }
    }

    async fn apply_success(
        &self,
        event: &GatewayEvent,
        payment_id: PaymentId,
        buyer_id: UserId,
        transaction_ref: String,
    ) -> Result<FulfillmentOutcome, WebhookError> {
        let Some(payment) = self.load(event, payment_id).await? else {
            return Ok(FulfillmentOutcome::PaymentNotFound { payment_id });
        };

        if !payment.is_owned_by(&buyer_id) {
            tracing::warn!(
                payment_id = %payment_id,
                expected_buyer = %payment.buyer_id,
                event_buyer = %buyer_id,
                "Buyer mismatch on success event"
            );
            self.record(ProcessedEvent::anomaly(event, "buyer mismatch"))
                .await;
            return Ok(FulfillmentOutcome::Anomaly { payment_id });
        }

        match payment.status {
            PaymentStatus::Pending => {}
            PaymentStatus::Successful => {
                self.record(ProcessedEvent::ignored(event, "payment already successful"))
                    .await;
                return Ok(FulfillmentOutcome::AlreadySettled { payment_id });
            }
            PaymentStatus::Failed | PaymentStatus::Cancelled => {
                return Ok(self.success_after_terminal(event, &payment).await);
            }
        }

        let settlement = Settlement::success(
            payment_id,
            transaction_ref,
            Enrollment::for_payment(&payment),
            ProcessedEvent::applied(event),
        );

        match self.payments.settle(settlement).await.map_err(storage)? {
            SettleOutcome::Applied(settled) => {
                tracing::info!(
                    payment_id = %settled.id,
                    buyer_id = %settled.buyer_id,
                    course_id = %settled.course_id,
                    event_key = %event.ledger_key(),
                    "Payment fulfilled"
                );
                self.join_room(&settled.course_id, &settled.buyer_id).await;
                self.invalidate_enrollments(&settled.buyer_id).await;
                Ok(FulfillmentOutcome::Fulfilled {
                    payment_id,
                    buyer_id: settled.buyer_id,
                })
            }
            // Lost the compare-and-set to a concurrent writer
            SettleOutcome::NotPending(current) if current.status == PaymentStatus::Successful => {
                self.record(ProcessedEvent::ignored(event, "settled concurrently"))
                    .await;
                Ok(FulfillmentOutcome::AlreadySettled { payment_id })
            }
            SettleOutcome::NotPending(current) => Ok(self.success_after_terminal(event, &current).await),
            SettleOutcome::NotFound => Ok(FulfillmentOutcome::PaymentNotFound { payment_id }),
        }
    }

    async fn apply_failure(
        &self,
        event: &GatewayEvent,
        payment_id: PaymentId,
    ) -> Result<FulfillmentOutcome, WebhookError> {
        let Some(payment) = self.load(event, payment_id).await? else {
            return Ok(FulfillmentOutcome::PaymentNotFound { payment_id });
        };

        if !payment.is_pending() {
            tracing::info!(
                payment_id = %payment_id,
                status = %payment.status,
                "Failure event for settled payment ignored"
            );
            self.record(ProcessedEvent::ignored(event, "payment already settled"))
                .await;
            return Ok(FulfillmentOutcome::AlreadySettled { payment_id });
        }

        match self
            .payments
            .settle(Settlement::failure(payment_id, ProcessedEvent::applied(event)))
            .await
            .map_err(storage)?
        {
            SettleOutcome::Applied(_) => {
                tracing::info!(
                    payment_id = %payment_id,
                    event_key = %event.ledger_key(),
                    "Payment marked failed"
                );
                Ok(FulfillmentOutcome::MarkedFailed { payment_id })
            }
            SettleOutcome::NotPending(_) => {
                self.record(ProcessedEvent::ignored(event, "settled concurrently"))
                    .await;
                Ok(FulfillmentOutcome::AlreadySettled { payment_id })
            }
            SettleOutcome::NotFound => Ok(FulfillmentOutcome::PaymentNotFound { payment_id }),
        }
    }

    async fn load(
        &self,
        event: &GatewayEvent,
        payment_id: PaymentId,
    ) -> Result<Option<Payment>, WebhookError> {
        let payment = self
            .payments
            .find_by_id(&payment_id)
            .await
            .map_err(storage)?;
        if payment.is_none() {
            tracing::warn!(
                payment_id = %payment_id,
                event_key = %event.ledger_key(),
                "Gateway event references unknown payment"
            );
            self.record(ProcessedEvent::anomaly(event, "payment not found"))
                .await;
        }
        Ok(payment)
    }

    /// A success arriving after failure or cancellation. Terminal states are
    /// never overwritten; the charge needs manual reconciliation.
    async fn success_after_terminal(&self, event: &GatewayEvent, payment: &Payment) -> FulfillmentOutcome {
        tracing::warn!(
            payment_id = %payment.id,
            status = %payment.status,
            event_key = %event.ledger_key(),
            "Success event for terminal payment, manual reconciliation required"
        );
        self.record(ProcessedEvent::anomaly(
            event,
            format!("success after {}", payment.status),
        ))
        .await;
        FulfillmentOutcome::Anomaly {
            payment_id: payment.id,
        }
    }

    /// Record a non-mutating outcome. Losing this record only costs a
    /// repeated no-op on redelivery.
    async fn record(&self, entry: ProcessedEvent) {
        if let Err(e) = self.ledger.record(entry).await {
            tracing::warn!(error = %e, "Failed to record processed gateway event");
        }
    }

    async fn join_room(&self, course_id: &CourseId, user_id: &UserId) {
        for attempt in 1..=ROOM_JOIN_ATTEMPTS {
            match self.rooms.add_participant(course_id, user_id).await {
                Ok(RoomJoin::Added) => return,
                Ok(RoomJoin::AlreadyParticipant) => {
                    tracing::debug!(course_id = %course_id, user_id = %user_id, "Buyer already in course room");
                    return;
                }
                Err(e) if attempt < ROOM_JOIN_ATTEMPTS => {
                    tracing::debug!(attempt, error = %e, "Room join failed, retrying");
                    tokio::time::sleep(ROOM_JOIN_BACKOFF * attempt).await;
                }
                Err(e) => {
                    tracing::error!(
                        course_id = %course_id,
                        user_id = %user_id,
                        error = %e,
                        "Failed to add buyer to course room"
                    );
                }
            }
        }
    }

    async fn invalidate_enrollments(&self, user_id: &UserId) {
        if let Err(e) = self.cache.invalidate(user_id).await {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to invalidate enrollment cache");
        }
    }
}

fn storage(err: DomainError) -> WebhookError {
    WebhookError::Database(err.to_string())
}
