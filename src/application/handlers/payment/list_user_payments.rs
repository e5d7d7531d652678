//! ListUserPaymentsHandler - Query handler for a buyer's payment history.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::payment::{Payment, PaymentError};
use crate::ports::PaymentRepository;

/// Query for every payment a user has made, newest first.
#[derive(Debug, Clone)]
pub struct ListUserPaymentsQuery {
    pub user_id: UserId,
    pub requester_id: UserId,
}

pub struct ListUserPaymentsHandler {
    payments: Arc<dyn PaymentRepository>,
}

impl ListUserPaymentsHandler {
    pub fn new(payments: Arc<dyn PaymentRepository>) -> Self {
        Self { payments }
    }

    /// Users may only list their own payments. Another user's history
    /// reads as not found so ids cannot be enumerated.
    pub async fn handle(&self, query: ListUserPaymentsQuery) -> Result<Vec<Payment>, PaymentError> {
        if query.user_id != query.requester_id {
            return Err(PaymentError::UserNotFound);
        }
        Ok(self.payments.list_by_buyer(&query.user_id).await?)
    }
}
