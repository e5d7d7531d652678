//! InitiatePaymentHandler - Command handler for starting a course purchase.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::foundation::{CourseId, ErrorCode, PaymentId, UserId};
use crate::domain::payment::{Payment, PaymentError, PaymentMethod, PaymentStatus};
use crate::ports::{
    CatalogReader, CheckoutGateways, CheckoutRequest, EnrollmentReader, PaymentRepository,
};

/// Command to start a purchase of a course.
#[derive(Debug, Clone)]
pub struct InitiatePaymentCommand {
    pub buyer_id: UserId,
    pub course_id: CourseId,
    /// Raw payment method as requested by the client.
    pub method: String,
}

/// Result of a successful initiation.
#[derive(Debug, Clone)]
pub struct InitiatePaymentResult {
    pub payment_id: PaymentId,
    /// Hosted checkout page the buyer is redirected to.
    pub payment_url: String,
}

/// Handler for starting a purchase.
///
/// The payment row is written only after the provider returns a checkout
/// session, so a gateway failure leaves nothing behind that would block a
/// retry. The partial unique indexes on the ledger catch a concurrent
/// initiation that slipped past the pre-checks.
pub struct InitiatePaymentHandler {
    payments: Arc<dyn PaymentRepository>,
    enrollments: Arc<dyn EnrollmentReader>,
    catalog: Arc<dyn CatalogReader>,
    gateways: CheckoutGateways,
    gateway_timeout: Duration,
}

impl InitiatePaymentHandler {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        enrollments: Arc<dyn EnrollmentReader>,
        catalog: Arc<dyn CatalogReader>,
        gateways: CheckoutGateways,
        gateway_timeout: Duration,
    ) -> Self {
        Self {
            payments,
            enrollments,
            catalog,
            gateways,
            gateway_timeout,
        }
    }

    pub async fn handle(
        &self,
        cmd: InitiatePaymentCommand,
    ) -> Result<InitiatePaymentResult, PaymentError> {
        // 1. Reject a second purchase attempt
        if let Some(existing) = self
            .payments
            .find_open_for(&cmd.buyer_id, &cmd.course_id)
            .await?
        {
            return Err(match existing.status {
                PaymentStatus::Successful => PaymentError::AlreadyPurchased,
                _ => PaymentError::AlreadyPending,
            });
        }

        // 2. Buyer must exist and be verified
        let buyer = self
            .catalog
            .find_buyer(&cmd.buyer_id)
            .await?
            .ok_or(PaymentError::UserNotFound)?;
        if !buyer.is_verified {
            return Err(PaymentError::UserNotVerified);
        }

        // 3. Course must exist; its catalog price is authoritative
        let course = self
            .catalog
            .find_course(&cmd.course_id)
            .await?
            .ok_or(PaymentError::CourseNotFound)?;

        // 4. An enrollment granted outside the payment flow also blocks purchase
        if self
            .enrollments
            .exists_for(&cmd.buyer_id, &cmd.course_id)
            .await?
        {
            return Err(PaymentError::AlreadyEnrolled);
        }

        // 5. Resolve the provider
        let method: PaymentMethod = cmd
            .method
            .parse()
            .map_err(|_| PaymentError::invalid_payment_method(&cmd.method))?;
        let gateway = self
            .gateways
            .get(method)
            .ok_or_else(|| PaymentError::invalid_payment_method(&cmd.method))?;

        // 6. Build the payment in memory; it is persisted after the provider call
        let payment = Payment::initiate(cmd.buyer_id.clone(), course.id, course.price, method)?;

        let request = CheckoutRequest {
            payment_id: payment.id,
            buyer_id: payment.buyer_id.clone(),
            amount: payment.amount,
            course_label: course.title.clone(),
        };

        // 7. Create the hosted checkout session within the deadline
        let session = match tokio::time::timeout(
            self.gateway_timeout,
            gateway.create_checkout_session(request),
        )
        .await
        {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => {
                tracing::warn!(
                    payment_id = %payment.id,
                    provider = %method,
                    error = %e,
                    "Checkout session creation failed"
                );
                return Err(e.into());
            }
            Err(_) => {
                tracing::warn!(
                    payment_id = %payment.id,
                    provider = %method,
                    timeout_ms = self.gateway_timeout.as_millis() as u64,
                    "Checkout session creation timed out"
                );
                return Err(PaymentError::gateway_unavailable(
                    "payment provider did not respond in time",
                    true,
                ));
            }
        };

        // 8. Persist the pending payment; the ledger rejects a racing duplicate
        if let Err(e) = self.payments.insert(&payment).await {
            return Err(match e.code {
                ErrorCode::PaymentPending => PaymentError::AlreadyPending,
                ErrorCode::AlreadyPurchased => PaymentError::AlreadyPurchased,
                _ => e.into(),
            });
        }

        tracing::info!(
            payment_id = %payment.id,
            buyer_id = %payment.buyer_id,
            course_id = %payment.course_id,
            provider = %method,
            amount = %payment.amount,
            session_id = %session.session_id,
            "Payment initiated"
        );

        Ok(InitiatePaymentResult {
            payment_id: payment.id,
            payment_url: session.redirect_url,
        })
    }
}
