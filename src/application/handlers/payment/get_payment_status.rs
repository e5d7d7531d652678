//! GetPaymentStatusHandler - Query handler for a single payment.

use std::sync::Arc;

use crate::domain::foundation::{PaymentId, UserId};
use crate::domain::payment::{Payment, PaymentError};
use crate::ports::PaymentRepository;

/// Query for the status of a payment.
#[derive(Debug, Clone)]
pub struct GetPaymentStatusQuery {
    pub payment_id: PaymentId,
    pub requester_id: UserId,
}

/// Handler for payment status lookups. Only the buyer may see a payment.
pub struct GetPaymentStatusHandler {
    payments: Arc<dyn PaymentRepository>,
}

impl GetPaymentStatusHandler {
    pub fn new(payments: Arc<dyn PaymentRepository>) -> Self {
        Self { payments }
    }

    pub async fn handle(&self, query: GetPaymentStatusQuery) -> Result<Payment, PaymentError> {
        self.payments
            .find_by_id(&query.payment_id)
            .await?
            .filter(|p| p.is_owned_by(&query.requester_id))
            .ok_or(PaymentError::NotFound(query.payment_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryPaymentStore;
    use crate::domain::foundation::CourseId;
    use crate::domain::payment::{PaymentMethod, PaymentStatus};
    use rust_decimal::Decimal;

    async fn setup() -> (GetPaymentStatusHandler, Payment) {
        let store = InMemoryPaymentStore::new();
        let payment = Payment::initiate(
            UserId::new("buyer-1").unwrap(),
            CourseId::new(),
            Decimal::new(250, 0),
            PaymentMethod::Paymob,
        )
        .unwrap();
        store.insert(&payment).await.unwrap();
        (GetPaymentStatusHandler::new(Arc::new(store)), payment)
    }

    #[tokio::test]
    async fn owner_reads_status() {
        let (handler, payment) = setup().await;

        let found = handler
            .handle(GetPaymentStatusQuery {
                payment_id: payment.id,
                requester_id: payment.buyer_id.clone(),
            })
            .await
            .unwrap();

        assert_eq!(found.status, PaymentStatus::Pending);
        assert_eq!(found.method, PaymentMethod::Paymob);
    }

    #[tokio::test]
    async fn non_owner_gets_not_found() {
        let (handler, payment) = setup().await;

        let result = handler
            .handle(GetPaymentStatusQuery {
                payment_id: payment.id,
                requester_id: UserId::new("someone-else").unwrap(),
            })
            .await;

        assert_eq!(result.unwrap_err(), PaymentError::NotFound(payment.id));
    }

    #[tokio::test]
    async fn missing_payment_gets_not_found() {
        let (handler, _) = setup().await;
        let id = PaymentId::new();

        let result = handler
            .handle(GetPaymentStatusQuery {
                payment_id: id,
                requester_id: UserId::new("buyer-1").unwrap(),
            })
            .await;

        assert_eq!(result.unwrap_err(), PaymentError::NotFound(id));
    }
}
