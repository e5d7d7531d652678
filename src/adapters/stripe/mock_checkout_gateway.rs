//! Mock checkout gateway for testing.
//!
//! Configurable `CheckoutGateway` for unit and integration tests:
//! - Pre-configured sessions
//! - Error injection and artificial latency
//! - Call tracking
//! - Real callback verification (Stripe or Paymob scheme) against a test secret

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::domain::payment::PaymentMethod;
use crate::domain::webhook::{GatewayEvent, PaymobWebhookVerifier, StripeWebhookVerifier, WebhookError};
use crate::ports::{CheckoutGateway, CheckoutRequest, CheckoutSession, GatewayError};

/// Mock checkout gateway.
///
/// # Example
///
/// ```ignore
/// let gateway = MockCheckoutGateway::stripe("whsec_test");
/// gateway.set_error(GatewayError::network("down"));
/// let result = gateway.create_checkout_session(request).await;
/// assert!(gateway.was_called());
/// ```
#[derive(Clone)]
pub struct MockCheckoutGateway {
    method: PaymentMethod,
    verifier: Arc<MockVerifier>,
    inner: Arc<Mutex<MockState>>,
}

enum MockVerifier {
    Stripe(StripeWebhookVerifier),
    Paymob(PaymobWebhookVerifier),
    RejectAll,
}

#[derive(Default)]
struct MockState {
    /// Next checkout session to return.
    next_session: Option<CheckoutSession>,

    /// Error to return on every checkout call until cleared.
    error: Option<GatewayError>,

    /// Latency added before answering.
    delay: Option<Duration>,

    /// Checkout requests received, in order.
    call_log: Vec<CheckoutRequest>,
}

impl MockCheckoutGateway {
    /// Stripe-flavoured mock verifying `Stripe-Signature` with `webhook_secret`.
    pub fn stripe(webhook_secret: &str) -> Self {
        Self::build(
            PaymentMethod::Stripe,
            MockVerifier::Stripe(StripeWebhookVerifier::new(SecretString::new(
                webhook_secret.to_string(),
            ))),
        )
    }

    /// Paymob-flavoured mock verifying the `hmac` value with `hmac_secret`.
    pub fn paymob(hmac_secret: &str) -> Self {
        Self::build(
            PaymentMethod::Paymob,
            MockVerifier::Paymob(PaymobWebhookVerifier::new(SecretString::new(
                hmac_secret.to_string(),
            ))),
        )
    }

    /// Mock that fails every callback verification.
    pub fn rejecting_webhooks(method: PaymentMethod) -> Self {
        Self::build(method, MockVerifier::RejectAll)
    }

    fn build(method: PaymentMethod, verifier: MockVerifier) -> Self {
        Self {
            method,
            verifier: Arc::new(verifier),
            inner: Arc::new(Mutex::new(MockState::default())),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    pub fn set_checkout_session(&self, session: CheckoutSession) {
        self.inner.lock().unwrap().next_session = Some(session);
    }

    pub fn set_error(&self, error: GatewayError) {
        self.inner.lock().unwrap().error = Some(error);
    }

    pub fn clear_error(&self) {
        self.inner.lock().unwrap().error = None;
    }

    /// Delay every checkout call, e.g. to exercise timeouts.
    pub fn set_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().delay = Some(delay);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<CheckoutRequest> {
        self.inner.lock().unwrap().call_log.clone()
    }

    pub fn was_called(&self) -> bool {
        !self.inner.lock().unwrap().call_log.is_empty()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().unwrap().call_log.len()
    }
}

#[async_trait]
impl CheckoutGateway for MockCheckoutGateway {
    fn method(&self) -> PaymentMethod {
        self.method
    }

    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let delay = {
            let mut state = self.inner.lock().unwrap();
            state.call_log.push(request.clone());
            state.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.inner.lock().unwrap();
        if let Some(error) = state.error.clone() {
            return Err(error);
        }

        Ok(state.next_session.take().unwrap_or_else(|| {
            let session_id = format!("cs_mock_{}", request.payment_id.as_uuid().simple());
            CheckoutSession {
                redirect_url: format!("https://checkout.mock/{}/{}", self.method, session_id),
                session_id,
            }
        }))
    }

    fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<GatewayEvent, WebhookError> {
        match self.verifier.as_ref() {
            MockVerifier::Stripe(verifier) => verifier
                .verify_and_parse(payload, signature)?
                .into_gateway_event(),
            MockVerifier::Paymob(verifier) => verifier.verify_and_decode(payload, signature),
            MockVerifier::RejectAll => Err(WebhookError::InvalidSignature),
        }
    }
}
