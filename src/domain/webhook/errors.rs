//! Webhook error types.
//!
//! Every condition webhook ingestion can end in, with the HTTP status
//! that tells the provider whether to redeliver.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that occur during webhook ingestion and fulfillment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    /// Signature header absent from the request.
    #[error("Missing signature")]
    MissingSignature,

    /// Webhook signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signed timestamp is older than the accepted window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Signed timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Failed to parse the signature header or verified payload.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Handled event type without the correlation metadata we attach.
    #[error("Missing metadata: {0}")]
    MissingMetadata(&'static str),

    /// Event was intentionally ignored (not an error condition).
    #[error("Event ignored: {0}")]
    Ignored(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// Returns true if the provider should redeliver this webhook.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::Database(_))
    }

    /// Returns true if the request never got past authentication.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            WebhookError::MissingSignature
                | WebhookError::InvalidSignature
                | WebhookError::TimestampOutOfRange
                | WebhookError::InvalidTimestamp
        )
    }

    /// Maps the error to the HTTP status returned to the provider.
    ///
    /// - 2xx: acknowledged, no redelivery
    /// - 4xx: rejected, no redelivery
    /// - 5xx: redelivered later
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::MissingSignature
            | WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange
            | WebhookError::InvalidTimestamp
            | WebhookError::ParseError(_) => StatusCode::BAD_REQUEST,

            // Foreign or malformed events are acknowledged so they stop arriving
            WebhookError::MissingMetadata(_) | WebhookError::Ignored(_) => StatusCode::OK,

            WebhookError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
