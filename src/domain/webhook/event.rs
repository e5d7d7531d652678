//! Provider-neutral inbound gateway event.

use crate::domain::foundation::{PaymentId, UserId};
use crate::domain::payment::PaymentMethod;

/// A verified, decoded provider notification.
///
/// A value, not an entity: only `event_id` is persisted, to guarantee
/// at-most-once processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayEvent {
    /// Provider-assigned event id, unique per provider.
    pub event_id: String,

    /// Provider the event came from.
    pub provider: PaymentMethod,

    /// Raw provider event type, for logging.
    pub event_type: String,

    pub kind: GatewayEventKind,
}

/// What a gateway event asks the fulfillment engine to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEventKind {
    /// Buyer paid. Settle the payment and grant access.
    CheckoutCompleted {
        payment_id: PaymentId,
        buyer_id: UserId,
        transaction_ref: String,
    },

    /// Charge failed or the hosted session expired unpaid.
    PaymentFailed { payment_id: PaymentId },

    /// Event type this service does not act on.
    Unhandled,
}

impl GatewayEvent {
    /// Ledger key for the idempotency gate, namespaced by provider.
    pub fn ledger_key(&self) -> String {
        format!("{}:{}", self.provider, self.event_id)
    }

    /// Payment the event refers to, if any.
    pub fn payment_id(&self) -> Option<PaymentId> {
        match &self.kind {
            GatewayEventKind::CheckoutCompleted { payment_id, .. }
            | GatewayEventKind::PaymentFailed { payment_id } => Some(*payment_id),
            GatewayEventKind::Unhandled => None,
        }
    }
}
