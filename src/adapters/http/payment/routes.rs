//! Axum router configuration for payment endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};

use super::handlers::{
    cancel_payment, get_payment_status, handle_paymob_webhook, handle_stripe_webhook, health,
    initiate_payment, list_enrollments, list_user_payments, PaymentAppState,
};

/// Buyer-facing payment routes, mounted at `/payment`.
///
/// All require the `X-User-Id` identity header.
/// - `POST /initiate` - Start a hosted checkout
/// - `GET /:paymentId/status` - Status of one of the caller's payments
/// - `DELETE /:paymentId` - Cancel a pending payment
/// - `GET /user/:userId` - The caller's payment history
pub fn payment_routes() -> Router<PaymentAppState> {
    Router::new()
        .route("/initiate", post(initiate_payment))
        .route("/:payment_id/status", get(get_payment_status))
        .route("/:payment_id", delete(cancel_payment))
        .route("/user/:user_id", get(list_user_payments))
}

/// Gateway callbacks, mounted at `/webhook`.
///
/// No user identity; each provider's signature is verified over the raw body.
/// - `POST /` - Stripe (`Stripe-Signature` header)
/// - `POST /paymob` - Paymob (`?hmac=` query parameter)
pub fn webhook_routes() -> Router<PaymentAppState> {
    Router::new()
        .route("/", post(handle_stripe_webhook))
        .route("/paymob", post(handle_paymob_webhook))
}

/// The complete payment service router, ready for `with_state`.
///
/// ```ignore
/// let app = payment_router().with_state(state);
/// ```
pub fn payment_router() -> Router<PaymentAppState> {
    Router::new()
        .nest("/payment", payment_routes())
        .nest("/webhook", webhook_routes())
        .route("/enrollments", get(list_enrollments))
        .route("/health", get(health))
}
