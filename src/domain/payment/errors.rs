//! Payment-specific error types.
//!
//! Errors surfaced by the user-facing payment operations (initiate,
//! cancel, status, listings). Webhook ingestion has its own taxonomy in
//! `domain::webhook`.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NotFound | 404 |
//! | UserNotFound | 404 |
//! | CourseNotFound | 404 |
//! | UserNotVerified | 403 |
//! | AlreadyPurchased | 409 |
//! | AlreadyPending | 409 |
//! | AlreadyEnrolled | 409 |
//! | InvalidPaymentMethod | 400 |
//! | NotPending | 400 |
//! | ValidationFailed | 400 |
//! | GatewayUnavailable | 503 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode, PaymentId, ValidationError};

/// Payment operation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// Payment does not exist or is not visible to the requester.
    NotFound(PaymentId),

    /// Buyer account does not exist.
    UserNotFound,

    /// Buyer has not confirmed their account.
    UserNotVerified,

    /// Course does not exist in the catalog.
    CourseNotFound,

    /// A successful payment already exists for this buyer and course.
    AlreadyPurchased,

    /// A pending payment already exists for this buyer and course.
    AlreadyPending,

    /// Buyer already holds an enrollment for this course.
    AlreadyEnrolled,

    /// Requested provider is not one of the supported set.
    InvalidPaymentMethod(String),

    /// Cancellation requested for a payment that already settled.
    NotPending,

    /// Request field failed validation.
    ValidationFailed { field: String, message: String },

    /// Payment provider could not create a checkout session.
    GatewayUnavailable { reason: String, retryable: bool },

    /// Storage or other infrastructure failure.
    Infrastructure(String),
}

impl PaymentError {
    pub fn not_found(id: PaymentId) -> Self {
        PaymentError::NotFound(id)
    }

    pub fn invalid_payment_method(method: impl Into<String>) -> Self {
        PaymentError::InvalidPaymentMethod(method.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        PaymentError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn gateway_unavailable(reason: impl Into<String>, retryable: bool) -> Self {
        PaymentError::GatewayUnavailable {
            reason: reason.into(),
            retryable,
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        PaymentError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            PaymentError::NotFound(_) => ErrorCode::PaymentNotFound,
            PaymentError::UserNotFound => ErrorCode::UserNotFound,
            PaymentError::UserNotVerified => ErrorCode::UserNotVerified,
            PaymentError::CourseNotFound => ErrorCode::CourseNotFound,
            PaymentError::AlreadyPurchased => ErrorCode::AlreadyPurchased,
            PaymentError::AlreadyPending => ErrorCode::PaymentPending,
            PaymentError::AlreadyEnrolled => ErrorCode::AlreadyEnrolled,
            PaymentError::InvalidPaymentMethod(_) => ErrorCode::InvalidPaymentMethod,
            PaymentError::NotPending => ErrorCode::PaymentNotPending,
            PaymentError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            PaymentError::GatewayUnavailable { .. } => ErrorCode::GatewayUnavailable,
            PaymentError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-friendly error message.
    pub fn message(&self) -> String {
        match self {
            PaymentError::NotFound(_) => "Payment not found".to_string(),
            PaymentError::UserNotFound => "User not found".to_string(),
            PaymentError::UserNotVerified => "User is not verified".to_string(),
            PaymentError::CourseNotFound => "Course not found".to_string(),
            PaymentError::AlreadyPurchased => "Course already purchased".to_string(),
            PaymentError::AlreadyPending => {
                "A payment for this course is already in progress".to_string()
            }
            PaymentError::AlreadyEnrolled => "User already enrolled in this course".to_string(),
            PaymentError::InvalidPaymentMethod(method) => {
                format!("Invalid payment method: {}", method)
            }
            PaymentError::NotPending => "Only pending payments can be cancelled".to_string(),
            PaymentError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            PaymentError::GatewayUnavailable { reason, .. } => {
                format!("Payment provider unavailable: {}", reason)
            }
            PaymentError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if the caller may retry the same request.
    pub fn is_retryable(&self) -> bool {
        match self {
            PaymentError::GatewayUnavailable { retryable, .. } => *retryable,
            PaymentError::Infrastructure(_) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for PaymentError {}

impl From<DomainError> for PaymentError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::InvalidStateTransition => PaymentError::NotPending,
            ErrorCode::AlreadyPurchased => PaymentError::AlreadyPurchased,
            ErrorCode::PaymentPending => PaymentError::AlreadyPending,
            ErrorCode::AlreadyEnrolled => PaymentError::AlreadyEnrolled,
            ErrorCode::ValidationFailed => PaymentError::ValidationFailed {
                field: err.field.unwrap_or_default(),
                message: err.message,
            },
            _ => PaymentError::Infrastructure(err.message),
        }
    }
}

impl From<ValidationError> for PaymentError {
    fn from(err: ValidationError) -> Self {
        if let ValidationError::IllegalTransition { .. } = err {
            return PaymentError::NotPending;
        }
        let field = err.field().unwrap_or_default().to_string();
        PaymentError::ValidationFailed {
            field,
            message: err.to_string(),
        }
    }
}
