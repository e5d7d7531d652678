//! Stripe webhook verification and decoding.
//!
//! Stripe signs `"{t}.{raw body}"` with HMAC-SHA256 and sends the result
//! in the `Stripe-Signature` header. Verification runs on the raw bytes
//! before any JSON parsing.

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::{GatewayEvent, GatewayEventKind, WebhookError};
use crate::domain::foundation::{PaymentId, Timestamp, UserId};
use crate::domain::payment::PaymentMethod;

/// Default maximum age for signed events (5 minutes).
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Maximum allowed clock skew for future events (1 minute).
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Metadata key carrying our payment id through Stripe.
pub const METADATA_PAYMENT_ID: &str = "paymentId";

/// Metadata key carrying the buyer id through Stripe.
pub const METADATA_BUYER_ID: &str = "buyerId";

/// Parsed components from the Stripe-Signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp when the signature was generated.
    pub timestamp: i64,
    /// v1 signatures (HMAC-SHA256). Several during secret rotation.
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    /// Parses a Stripe-Signature header string.
    ///
    /// Format: `t=<timestamp>,v1=<signature>[,v1=<signature>][,v0=<legacy>]`
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::ParseError` if the header format is invalid.
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| WebhookError::ParseError("invalid header format".to_string()))?;

            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| {
                        WebhookError::ParseError("invalid timestamp".to_string())
                    })?);
                }
                "v1" => {
                    v1_signatures.push(hex::decode(value).map_err(|_| {
                        WebhookError::ParseError("invalid v1 signature hex".to_string())
                    })?);
                }
                // v0 is Stripe's test-only legacy scheme; never trusted
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| WebhookError::ParseError("missing timestamp".to_string()))?;
        if v1_signatures.is_empty() {
            return Err(WebhookError::ParseError("missing v1 signature".to_string()));
        }

        Ok(SignatureHeader {
            timestamp,
            v1_signatures,
        })
    }
}

/// Verifier for Stripe webhook signatures.
pub struct StripeWebhookVerifier {
    secret: SecretString,
    tolerance_secs: i64,
}

impl StripeWebhookVerifier {
    /// Creates a verifier with the default 5 minute replay window.
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    /// Overrides the replay window.
    pub fn with_tolerance_secs(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Verifies the signature over the raw payload.
    ///
    /// # Verification Steps
    ///
    /// 1. Parse the signature header
    /// 2. Validate timestamp is within the replay window
    /// 3. Compute expected signature using HMAC-SHA256
    /// 4. Compare against every v1 signature in constant time
    ///
    /// # Errors
    ///
    /// - `ParseError` - malformed header
    /// - `TimestampOutOfRange` - event older than the replay window
    /// - `InvalidTimestamp` - event timestamp is in the future
    /// - `InvalidSignature` - no signature matched
    pub fn verify(&self, payload: &[u8], signature_header: &str) -> Result<(), WebhookError> {
        let header = SignatureHeader::parse(signature_header)?;
        self.validate_timestamp(header.timestamp)?;

        let expected = self.compute_signature(header.timestamp, payload)?;
        let matched = header
            .v1_signatures
            .iter()
            .any(|candidate| constant_time_compare(&expected, candidate));
        if !matched {
            return Err(WebhookError::InvalidSignature);
        }
        Ok(())
    }

    /// Verifies the signature, then parses the payload into a StripeEvent.
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent, WebhookError> {
        self.verify(payload, signature_header)?;
        serde_json::from_slice(payload).map_err(|e| WebhookError::ParseError(e.to_string()))
    }

    fn validate_timestamp(&self, timestamp: i64) -> Result<(), WebhookError> {
        let age = Timestamp::now().secs_since_unix(timestamp);

        if age > self.tolerance_secs {
            return Err(WebhookError::TimestampOutOfRange);
        }
        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(WebhookError::InvalidTimestamp);
        }
        Ok(())
    }

    fn compute_signature(&self, timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, WebhookError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| WebhookError::InvalidSignature)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// Constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Computes a hex `v1` signature for use in test fixtures.
#[cfg(test)]
pub fn compute_test_signature(secret: &str, timestamp: i64, payload: &str) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key");
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

// ══════════════════════════════════════════════════════════════
// Event envelope
// ══════════════════════════════════════════════════════════════

/// Stripe webhook event (simplified).
///
/// Only the fields fulfillment needs are captured.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Type of event (e.g., "checkout.session.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    #[serde(default)]
    pub created: i64,

    pub data: StripeEventData,

    #[serde(default)]
    pub livemode: bool,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// The object that triggered the event (polymorphic based on event type).
    pub object: serde_json::Value,
}

/// The parts of a checkout session or payment intent we read.
#[derive(Debug, Clone, Default, Deserialize)]
struct StripeObject {
    id: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
    payment_status: Option<String>,
}

/// Stripe event types this service acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripeEventType {
    CheckoutSessionCompleted,
    CheckoutSessionAsyncPaymentSucceeded,
    CheckoutSessionAsyncPaymentFailed,
    CheckoutSessionExpired,
    PaymentIntentPaymentFailed,
    Unknown,
}

impl StripeEventType {
    /// Parse event type from string.
    pub fn parse(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "checkout.session.async_payment_succeeded" => Self::CheckoutSessionAsyncPaymentSucceeded,
            "checkout.session.async_payment_failed" => Self::CheckoutSessionAsyncPaymentFailed,
            "checkout.session.expired" => Self::CheckoutSessionExpired,
            "payment_intent.payment_failed" => Self::PaymentIntentPaymentFailed,
            _ => Self::Unknown,
        }
    }
}

impl StripeEvent {
    pub fn parsed_type(&self) -> StripeEventType {
        StripeEventType::parse(&self.event_type)
    }

    /// Decode into a provider-neutral gateway event.
    ///
    /// # Errors
    ///
    /// - `MissingMetadata` - handled type without our correlation metadata
    /// - `Ignored` - completed checkout still awaiting an async payment, or
    ///   metadata that does not reference one of our payments
    pub fn into_gateway_event(self) -> Result<GatewayEvent, WebhookError> {
        let kind = match self.parsed_type() {
            StripeEventType::Unknown => GatewayEventKind::Unhandled,
            StripeEventType::CheckoutSessionCompleted
            | StripeEventType::CheckoutSessionAsyncPaymentSucceeded => {
                let object = self.object()?;
                if object.payment_status.as_deref() == Some("unpaid") {
                    return Err(WebhookError::Ignored(
                        "checkout completed but payment is still processing".to_string(),
                    ));
                }
                let payment_id = payment_id_from(&object.metadata)?;
                let buyer_id = object
                    .metadata
                    .get(METADATA_BUYER_ID)
                    .and_then(|raw| UserId::new(raw.as_str()).ok())
                    .ok_or(WebhookError::MissingMetadata(METADATA_BUYER_ID))?;
                let transaction_ref = object.id.ok_or_else(|| {
                    WebhookError::ParseError("checkout session without id".to_string())
                })?;
                GatewayEventKind::CheckoutCompleted {
                    payment_id,
                    buyer_id,
                    transaction_ref,
                }
            }
            StripeEventType::CheckoutSessionAsyncPaymentFailed
            | StripeEventType::CheckoutSessionExpired
            | StripeEventType::PaymentIntentPaymentFailed => {
                let object = self.object()?;
                GatewayEventKind::PaymentFailed {
                    payment_id: payment_id_from(&object.metadata)?,
                }
            }
        };

        Ok(GatewayEvent {
            event_id: self.id,
            provider: PaymentMethod::Stripe,
            event_type: self.event_type,
            kind,
        })
    }

    fn object(&self) -> Result<StripeObject, WebhookError> {
        serde_json::from_value(self.data.object.clone())
            .map_err(|e| WebhookError::ParseError(e.to_string()))
    }
}

fn payment_id_from(metadata: &HashMap<String, String>) -> Result<PaymentId, WebhookError> {
    let raw = metadata
        .get(METADATA_PAYMENT_ID)
        .filter(|raw| !raw.is_empty())
        .ok_or(WebhookError::MissingMetadata(METADATA_PAYMENT_ID))?;
    raw.parse()
        .map_err(|_| WebhookError::Ignored(format!("foreign payment id '{}'", raw)))
}
