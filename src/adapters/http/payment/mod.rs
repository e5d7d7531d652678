//! HTTP adapter for course purchases, enrollments and gateway callbacks.

mod dto;
mod handlers;
mod routes;

pub use dto::*;
pub use handlers::{AuthenticatedUser, PaymentApiError, PaymentAppState, WebhookApiError};
pub use routes::{payment_router, payment_routes, webhook_routes};
