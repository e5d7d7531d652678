//! Checkout gateway port for external payment providers.
//!
//! One implementation per supported provider. Each creates hosted
//! checkout sessions and authenticates that provider's callbacks.
//!
//! # Design
//!
//! - **Correlation by metadata**: the payment id and buyer id travel to
//!   the provider as opaque metadata and come back in the callback
//! - **No I/O in verification**: callback authentication is pure and
//!   runs over the raw request body

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::{PaymentId, UserId};
use crate::domain::payment::{PaymentError, PaymentMethod};
use crate::domain::webhook::{GatewayEvent, WebhookError};

/// Port for a hosted-checkout payment provider.
#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    /// Which provider this gateway talks to.
    fn method(&self) -> PaymentMethod;

    /// Create a hosted checkout session for one purchase.
    ///
    /// Returns the URL the buyer is redirected to.
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError>;

    /// Authenticate a callback and decode it into a gateway event.
    ///
    /// `signature` is the provider's signature value (header or query).
    fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<GatewayEvent, WebhookError>;
}

/// Request to create a checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Internal payment id, echoed back in the provider callback.
    pub payment_id: PaymentId,

    /// Buyer, echoed back in the provider callback.
    pub buyer_id: UserId,

    /// Amount to charge in major currency units.
    pub amount: Decimal,

    /// Line item label shown on the hosted page.
    pub course_label: String,
}

/// Checkout session created by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session id.
    pub session_id: String,

    /// URL for the buyer to complete payment.
    pub redirect_url: String,
}

/// Supported gateways keyed by payment method.
#[derive(Clone, Default)]
pub struct CheckoutGateways {
    gateways: HashMap<PaymentMethod, Arc<dyn CheckoutGateway>>,
}

impl CheckoutGateways {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a gateway under its own method.
    pub fn with(mut self, gateway: Arc<dyn CheckoutGateway>) -> Self {
        self.gateways.insert(gateway.method(), gateway);
        self
    }

    pub fn get(&self, method: PaymentMethod) -> Option<Arc<dyn CheckoutGateway>> {
        self.gateways.get(&method).cloned()
    }

    /// Methods with a configured gateway.
    pub fn methods(&self) -> Vec<PaymentMethod> {
        PaymentMethod::ALL
            .into_iter()
            .filter(|m| self.gateways.contains_key(m))
            .collect()
    }
}

/// Errors from payment provider calls.
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct GatewayError {
    /// Error code for categorization.
    pub code: GatewayErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl GatewayError {
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NetworkError, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Timeout, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::ProviderError, message)
    }
}

impl From<GatewayError> for PaymentError {
    fn from(err: GatewayError) -> Self {
        PaymentError::gateway_unavailable(err.to_string(), err.retryable)
    }
}

/// Gateway error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    /// Network connectivity issue.
    #[error("network_error")]
    NetworkError,

    /// Provider did not answer within the configured timeout.
    #[error("timeout")]
    Timeout,

    #[error("rate_limit_exceeded")]
    RateLimitExceeded,

    /// API credentials rejected.
    #[error("authentication_error")]
    AuthenticationError,

    /// Provider rejected the request as malformed.
    #[error("invalid_request")]
    InvalidRequest,

    /// Provider-side failure.
    #[error("provider_error")]
    ProviderError,
}

impl GatewayErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayErrorCode::NetworkError
                | GatewayErrorCode::Timeout
                | GatewayErrorCode::RateLimitExceeded
                | GatewayErrorCode::ProviderError
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_gateway_is_object_safe() {
        fn _accepts_dyn(_gateway: &dyn CheckoutGateway) {}
    }

    #[test]
    fn transient_errors_are_retryable() {
        assert!(GatewayErrorCode::NetworkError.is_retryable());
        assert!(GatewayErrorCode::Timeout.is_retryable());
        assert!(GatewayErrorCode::RateLimitExceeded.is_retryable());

        assert!(!GatewayErrorCode::AuthenticationError.is_retryable());
        assert!(!GatewayErrorCode::InvalidRequest.is_retryable());
    }

    #[test]
    fn gateway_error_display_includes_code() {
        let err = GatewayError::network("connection reset");
        assert_eq!(err.to_string(), "network_error: connection reset");
    }

    #[test]
    fn gateway_error_boxes_as_std_error() {
        let boxed: Box<dyn std::error::Error> =
            Box::new(GatewayError::new(GatewayErrorCode::RateLimitExceeded, "slow down"));
        assert_eq!(boxed.to_string(), "rate_limit_exceeded: slow down");
        assert_eq!(GatewayErrorCode::InvalidRequest.to_string(), "invalid_request");
    }

    #[test]
    fn gateway_error_converts_to_retryable_payment_error() {
        let err: PaymentError = GatewayError::timeout("no answer in 10s").into();
        assert!(err.is_retryable());
        assert!(matches!(err, PaymentError::GatewayUnavailable { .. }));
    }

    #[test]
    fn empty_registry_has_no_methods() {
        let gateways = CheckoutGateways::new();
        assert!(gateways.methods().is_empty());
        assert!(gateways.get(PaymentMethod::Stripe).is_none());
    }
}
