//! Paymob transaction callback verification and decoding.
//!
//! Paymob signs a fixed, ordered list of transaction fields with
//! HMAC-SHA512 and passes the hex digest in the `hmac` query parameter.
//! The body is decoded only to read those fields; nothing acts on it
//! until the digest matches.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use sha2::Sha512;
use subtle::ConstantTimeEq;

use super::{GatewayEvent, GatewayEventKind, WebhookError};
use crate::domain::foundation::{PaymentId, UserId};
use crate::domain::payment::PaymentMethod;

/// Extras key carrying our payment id through Paymob.
pub const EXTRA_PAYMENT_ID: &str = "payment_id";

/// Extras key carrying the buyer id through Paymob.
pub const EXTRA_BUYER_ID: &str = "buyer_id";

/// Transaction fields covered by the HMAC, in signing order.
const SIGNED_FIELDS: [&str; 20] = [
    "amount_cents",
    "created_at",
    "currency",
    "error_occured",
    "has_parent_transaction",
    "id",
    "integration_id",
    "is_3d_secure",
    "is_auth",
    "is_capture",
    "is_refunded",
    "is_standalone_payment",
    "is_voided",
    "order.id",
    "owner",
    "pending",
    "source_data.pan",
    "source_data.sub_type",
    "source_data.type",
    "success",
];

/// Verifier for Paymob transaction callbacks.
pub struct PaymobWebhookVerifier {
    hmac_secret: SecretString,
}

impl PaymobWebhookVerifier {
    pub fn new(hmac_secret: SecretString) -> Self {
        Self { hmac_secret }
    }

    /// Verifies the `hmac` query value against the callback body and
    /// decodes it into a gateway event.
    ///
    /// # Errors
    ///
    /// - `MissingSignature` - empty hmac parameter
    /// - `ParseError` - body is not a Paymob transaction callback
    /// - `InvalidSignature` - digest mismatch
    pub fn verify_and_decode(&self, payload: &[u8], hmac_hex: &str) -> Result<GatewayEvent, WebhookError> {
        if hmac_hex.trim().is_empty() {
            return Err(WebhookError::MissingSignature);
        }
        let provided = hex::decode(hmac_hex.trim().to_ascii_lowercase())
            .map_err(|_| WebhookError::InvalidSignature)?;

        let body: Value =
            serde_json::from_slice(payload).map_err(|e| WebhookError::ParseError(e.to_string()))?;
        let transaction = body
            .get("obj")
            .filter(|obj| obj.is_object())
            .ok_or_else(|| WebhookError::ParseError("missing transaction object".to_string()))?;

        let expected = self.compute_digest(&signing_string(transaction))?;
        if expected.len() != provided.len() || !bool::from(expected.ct_eq(&provided)) {
            return Err(WebhookError::InvalidSignature);
        }

        decode_transaction(transaction)
    }

    fn compute_digest(&self, message: &str) -> Result<Vec<u8>, WebhookError> {
        let mut mac = Hmac::<Sha512>::new_from_slice(self.hmac_secret.expose_secret().as_bytes())
            .map_err(|_| WebhookError::InvalidSignature)?;
        mac.update(message.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// Concatenates the signed fields the way Paymob does.
fn signing_string(transaction: &Value) -> String {
    SIGNED_FIELDS
        .iter()
        .map(|path| {
            let value = path
                .split('.')
                .try_fold(transaction, |node, key| node.get(key));
            match value {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            }
        })
        .collect()
}

fn decode_transaction(transaction: &Value) -> Result<GatewayEvent, WebhookError> {
    let event_id = match transaction.get("id") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => return Err(WebhookError::ParseError("transaction without id".to_string())),
    };

    if flag(transaction, "pending") {
        return Err(WebhookError::Ignored(format!(
            "transaction {} still pending",
            event_id
        )));
    }

    let extras = transaction
        .get("payment_key_claims")
        .and_then(|claims| claims.get("extra"));
    let extra = |key: &str| {
        extras
            .and_then(|e| e.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let raw_payment_id = extra(EXTRA_PAYMENT_ID)
        .or_else(|| {
            transaction
                .get("order")
                .and_then(|order| order.get("merchant_order_id"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .ok_or(WebhookError::MissingMetadata(EXTRA_PAYMENT_ID))?;
    let payment_id: PaymentId = raw_payment_id
        .parse()
        .map_err(|_| WebhookError::Ignored(format!("foreign payment id '{}'", raw_payment_id)))?;

    let kind = if flag(transaction, "success") {
        let buyer_id = extra(EXTRA_BUYER_ID)
            .and_then(|raw| UserId::new(raw).ok())
            .ok_or(WebhookError::MissingMetadata(EXTRA_BUYER_ID))?;
        GatewayEventKind::CheckoutCompleted {
            payment_id,
            buyer_id,
            transaction_ref: event_id.clone(),
        }
    } else {
        GatewayEventKind::PaymentFailed { payment_id }
    };

    Ok(GatewayEvent {
        event_id,
        provider: PaymentMethod::Paymob,
        event_type: "TRANSACTION".to_string(),
        kind,
    })
}

fn flag(transaction: &Value, key: &str) -> bool {
    transaction.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Computes the hex digest Paymob would send, for test fixtures.
#[cfg(test)]
pub fn compute_test_hmac(secret: &str, body: &Value) -> String {
    let mut mac = Hmac::<Sha512>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key");
    mac.update(signing_string(&body["obj"]).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
