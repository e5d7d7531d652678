//! CancelPaymentHandler - Command handler for abandoning a pending payment.

use std::sync::Arc;

use crate::domain::foundation::{PaymentId, UserId};
use crate::domain::payment::{Payment, PaymentError};
use crate::ports::{PaymentRepository, SettleOutcome, Settlement};

/// Command to cancel a pending payment.
#[derive(Debug, Clone)]
pub struct CancelPaymentCommand {
    pub payment_id: PaymentId,
    pub requester_id: UserId,
}

/// Result of a successful cancellation.
#[derive(Debug, Clone)]
pub struct CancelPaymentResult {
    pub payment: Payment,
}

/// Handler for cancelling a payment.
///
/// Cancellation goes through the same compare-and-set as fulfillment, so a
/// webhook that settles the payment concurrently wins or loses cleanly.
/// The hosted checkout session is not expired at the provider; a buyer
/// who completes it anyway triggers an anomaly log in fulfillment.
pub struct CancelPaymentHandler {
    payments: Arc<dyn PaymentRepository>,
}

impl CancelPaymentHandler {
    pub fn new(payments: Arc<dyn PaymentRepository>) -> Self {
        Self { payments }
    }

    pub async fn handle(&self, cmd: CancelPaymentCommand) -> Result<CancelPaymentResult, PaymentError> {
        // Someone else's payment is indistinguishable from a missing one
        let payment = self
            .payments
            .find_by_id(&cmd.payment_id)
            .await?
            .filter(|p| p.is_owned_by(&cmd.requester_id))
            .ok_or(PaymentError::NotFound(cmd.payment_id))?;

        match self
            .payments
            .settle(Settlement::cancellation(payment.id))
            .await?
        {
            SettleOutcome::Applied(payment) => {
                tracing::info!(
                    payment_id = %payment.id,
                    buyer_id = %payment.buyer_id,
                    "Payment cancelled"
                );
                Ok(CancelPaymentResult { payment })
            }
            SettleOutcome::NotPending(current) => {
                tracing::debug!(
                    payment_id = %current.id,
                    status = %current.status,
                    "Cancellation refused for settled payment"
                );
                Err(PaymentError::NotPending)
            }
            SettleOutcome::NotFound => Err(PaymentError::NotFound(cmd.payment_id)),
        }
    }
}
