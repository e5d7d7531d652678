//! HTTP DTOs for payment endpoints.
//!
//! JSON field names are camelCase to match the storefront client.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::payment::{Enrollment, Payment, PaymentStatus};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to start a purchase.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentRequest {
    /// Course to buy; must be a UUID.
    pub course_id: String,
    /// Provider to check out with ("stripe" or "paymob").
    pub payment_method: String,
}

/// Query string Paymob appends to its transaction callback.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymobCallbackParams {
    pub hmac: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentResponse {
    pub payment_id: String,
    /// Hosted checkout page the buyer is redirected to.
    pub payment_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentStatusResponse {
    pub status: PaymentStatus,
}

/// Payment projection returned to its buyer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: String,
    pub course_id: String,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub payment_method: String,
    pub transaction_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id.to_string(),
            course_id: payment.course_id.to_string(),
            amount: payment.amount,
            status: payment.status,
            payment_method: payment.method.as_str().to_string(),
            transaction_ref: payment.transaction_ref,
            created_at: *payment.created_at.as_datetime(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResponse {
    pub course_id: String,
    pub payment_id: String,
    pub enrolled_at: DateTime<Utc>,
}

impl From<Enrollment> for EnrollmentResponse {
    fn from(enrollment: Enrollment) -> Self {
        Self {
            course_id: enrollment.course_id.to_string(),
            payment_id: enrollment.payment_id.to_string(),
            enrolled_at: *enrollment.enrolled_at.as_datetime(),
        }
    }
}

/// Acknowledgement sent to a gateway for every accepted callback.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    pub received: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Standard error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
