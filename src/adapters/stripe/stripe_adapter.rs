//! Stripe checkout adapter.
//!
//! Implements the `CheckoutGateway` port with Stripe Checkout Sessions in
//! `payment` mode and Stripe's signed webhooks.
//!
//! # Security
//!
//! - HMAC-SHA256 signature verification with constant-time comparison
//! - Timestamp validation (5-minute window by default) for replay protection
//! - Secrets handled via `secrecy::SecretString`
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(api_key, webhook_secret, "https://app.example.com");
//! let adapter = StripeCheckoutAdapter::new(config);
//! ```

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use crate::domain::payment::PaymentMethod;
use crate::domain::webhook::stripe::DEFAULT_TOLERANCE_SECS;
use crate::domain::webhook::{GatewayEvent, StripeWebhookVerifier, WebhookError};
use crate::ports::{CheckoutGateway, CheckoutRequest, CheckoutSession, GatewayError, GatewayErrorCode};

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    /// ISO currency code, lowercase as Stripe expects.
    currency: String,

    /// Frontend origin for the success and cancel redirects.
    frontend_url: String,

    /// Whether to act only on livemode events.
    require_livemode: bool,

    tolerance_secs: i64,
    request_timeout: Duration,
}

impl StripeConfig {
    pub fn new(
        api_key: impl Into<String>,
        webhook_secret: impl Into<String>,
        frontend_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            webhook_secret: SecretString::new(webhook_secret.into()),
            api_base_url: "https://api.stripe.com".to_string(),
            currency: "egp".to_string(),
            frontend_url: frontend_url.into().trim_end_matches('/').to_string(),
            require_livemode: false,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_currency(mut self, currency: impl AsRef<str>) -> Self {
        self.currency = currency.as_ref().to_lowercase();
        self
    }

    /// Only act on livemode events in production.
    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }

    pub fn with_tolerance_secs(mut self, secs: i64) -> Self {
        self.tolerance_secs = secs;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Stripe checkout adapter.
pub struct StripeCheckoutAdapter {
    config: StripeConfig,
    verifier: StripeWebhookVerifier,
    http_client: reqwest::Client,
}

impl StripeCheckoutAdapter {
    pub fn new(config: StripeConfig) -> Self {
        let verifier = StripeWebhookVerifier::new(config.webhook_secret.clone())
            .with_tolerance_secs(config.tolerance_secs);
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_default();
        Self {
            config,
            verifier,
            http_client,
        }
    }

    /// Form body for `POST /v1/checkout/sessions`.
    ///
    /// The payment id is set on the session and on the payment intent so
    /// that both `checkout.session.*` and `payment_intent.*` events carry it.
    fn checkout_form(&self, request: &CheckoutRequest) -> Result<Vec<(&'static str, String)>, GatewayError> {
        let unit_amount = minor_units(request.amount).ok_or_else(|| {
            GatewayError::new(
                GatewayErrorCode::InvalidRequest,
                format!("amount {} cannot be charged", request.amount),
            )
        })?;
        let payment_id = request.payment_id.to_string();
        let buyer_id = request.buyer_id.to_string();

        Ok(vec![
            ("mode", "payment".to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", self.config.currency.clone()),
            ("line_items[0][price_data][unit_amount]", unit_amount.to_string()),
            ("line_items[0][price_data][product_data][name]", request.course_label.clone()),
            (
                "success_url",
                format!("{}/success?session_id={{CHECKOUT_SESSION_ID}}", self.config.frontend_url),
            ),
            ("cancel_url", format!("{}/cancel", self.config.frontend_url)),
            ("client_reference_id", payment_id.clone()),
            ("metadata[paymentId]", payment_id.clone()),
            ("metadata[buyerId]", buyer_id),
            ("payment_intent_data[metadata][paymentId]", payment_id),
        ])
    }
}

/// Converts major units to the integer minor units Stripe charges in.
fn minor_units(amount: Decimal) -> Option<i64> {
    if amount <= Decimal::ZERO {
        return None;
    }
    (amount * Decimal::ONE_HUNDRED).round().to_i64()
}

#[derive(Debug, Deserialize)]
struct StripeCheckoutSession {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Maps a non-2xx Stripe response to a gateway error.
fn error_from_response(status: reqwest::StatusCode, body: &str) -> GatewayError {
    let detail = serde_json::from_str::<StripeErrorBody>(body).ok().map(|b| b.error);
    let message = detail
        .as_ref()
        .and_then(|d| d.message.clone())
        .unwrap_or_else(|| format!("Stripe API error ({})", status));

    let code = match status.as_u16() {
        401 | 403 => GatewayErrorCode::AuthenticationError,
        429 => GatewayErrorCode::RateLimitExceeded,
        400..=499 => GatewayErrorCode::InvalidRequest,
        _ => GatewayErrorCode::ProviderError,
    };

    let error = GatewayError::new(code, message);
    match detail.and_then(|d| d.code) {
        Some(provider_code) => error.with_provider_code(provider_code),
        None => error,
    }
}

fn error_from_transport(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::timeout(err.to_string())
    } else {
        GatewayError::network(err.to_string())
    }
}

#[async_trait]
impl CheckoutGateway for StripeCheckoutAdapter {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Stripe
    }

    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);
        let params = self.checkout_form(&request)?;

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .header("Idempotency-Key", format!("checkout-{}", request.payment_id))
            .form(&params)
            .send()
            .await
            .map_err(error_from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, error = %error_text, "Stripe create_checkout_session failed");
            return Err(error_from_response(status, &error_text));
        }

        let session: StripeCheckoutSession = response.json().await.map_err(|e| {
            GatewayError::provider(format!("Failed to parse Stripe response: {}", e))
        })?;

        let redirect_url = session.url.ok_or_else(|| {
            GatewayError::provider(format!("Stripe session {} has no checkout URL", session.id))
        })?;

        Ok(CheckoutSession {
            session_id: session.id,
            redirect_url,
        })
    }

    fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<GatewayEvent, WebhookError> {
        let event = self.verifier.verify_and_parse(payload, signature)?;

        if self.config.require_livemode && !event.livemode {
            tracing::warn!(event_id = %event.id, "Test mode event received by live endpoint");
            return Err(WebhookError::Ignored("test mode event".to_string()));
        }

        event.into_gateway_event()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{PaymentId, Timestamp, UserId};
    use crate::domain::webhook::{compute_test_signature, GatewayEventKind};
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Form, Json, Router};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    const WEBHOOK_SECRET: &str = "whsec_test_secret";

    fn test_config() -> StripeConfig {
        StripeConfig::new("sk_test_key", WEBHOOK_SECRET, "https://courses.example/")
    }

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            payment_id: PaymentId::new(),
            buyer_id: UserId::new("buyer-1").unwrap(),
            amount: Decimal::new(49950, 2),
            course_label: "Async Rust".to_string(),
        }
    }

    fn signed(payload: &str) -> String {
        let ts = Timestamp::now().as_unix_secs();
        format!("t={},v1={}", ts, compute_test_signature(WEBHOOK_SECRET, ts, payload))
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Config and form tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn config_new_sets_defaults() {
        let config = test_config();
        assert_eq!(config.api_base_url, "https://api.stripe.com");
        assert_eq!(config.currency, "egp");
        assert_eq!(config.frontend_url, "https://courses.example");
        assert!(!config.require_livemode);
    }

    #[test]
    fn currency_is_lowercased() {
        assert_eq!(test_config().with_currency("USD").currency, "usd");
    }

    #[test]
    fn minor_units_rounds_to_cents() {
        assert_eq!(minor_units(Decimal::new(49950, 2)), Some(49950));
        assert_eq!(minor_units(Decimal::new(10, 0)), Some(1000));
        assert_eq!(minor_units(Decimal::new(1005, 3)), Some(100));
        assert_eq!(minor_units(Decimal::ZERO), None);
    }

    #[test]
    fn checkout_form_carries_correlation_metadata() {
        let adapter = StripeCheckoutAdapter::new(test_config());
        let req = request();

        let form: HashMap<_, _> = adapter.checkout_form(&req).unwrap().into_iter().collect();

        assert_eq!(form["mode"], "payment");
        assert_eq!(form["line_items[0][price_data][unit_amount]"], "49950");
        assert_eq!(form["line_items[0][price_data][currency]"], "egp");
        assert_eq!(form["line_items[0][price_data][product_data][name]"], "Async Rust");
        assert_eq!(form["metadata[paymentId]"], req.payment_id.to_string());
        assert_eq!(form["metadata[buyerId]"], "buyer-1");
        assert_eq!(form["payment_intent_data[metadata][paymentId]"], req.payment_id.to_string());
        assert_eq!(
            form["success_url"],
            "https://courses.example/success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(form["cancel_url"], "https://courses.example/cancel");
    }

    #[test]
    fn stripe_errors_map_to_gateway_codes() {
        let body = r#"{"error":{"code":"rate_limit","message":"Too many requests"}}"#;
        let err = error_from_response(reqwest::StatusCode::TOO_MANY_REQUESTS, body);
        assert_eq!(err.code, GatewayErrorCode::RateLimitExceeded);
        assert_eq!(err.provider_code.as_deref(), Some("rate_limit"));
        assert!(err.retryable);

        let err = error_from_response(reqwest::StatusCode::UNAUTHORIZED, "not json");
        assert_eq!(err.code, GatewayErrorCode::AuthenticationError);
        assert!(!err.retryable);

        let err = error_from_response(reqwest::StatusCode::BAD_GATEWAY, "");
        assert_eq!(err.code, GatewayErrorCode::ProviderError);
        assert!(err.retryable);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Checkout session against a local stub
    // ════════════════════════════════════════════════════════════════════════════

    type Captured = Arc<Mutex<Option<(HeaderMap, HashMap<String, String>)>>>;

    async fn spawn_stub(status: StatusCode, body: serde_json::Value) -> (String, Captured) {
        let captured: Captured = Arc::new(Mutex::new(None));
        let app = Router::new()
            .route(
                "/v1/checkout/sessions",
                post(
                    move |State(captured): State<Captured>,
                          headers: HeaderMap,
                          Form(form): Form<HashMap<String, String>>| {
                        let body = body.clone();
                        async move {
                            *captured.lock().unwrap() = Some((headers, form));
                            (status, Json(body))
                        }
                    },
                ),
            )
            .with_state(captured.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), captured)
    }

    #[tokio::test]
    async fn create_checkout_session_returns_hosted_url() {
        let (base, captured) = spawn_stub(
            StatusCode::OK,
            serde_json::json!({ "id": "cs_test_123", "url": "https://checkout.stripe.com/c/pay/cs_test_123" }),
        )
        .await;
        let adapter = StripeCheckoutAdapter::new(test_config().with_base_url(base));
        let req = request();

        let session = adapter.create_checkout_session(req.clone()).await.unwrap();

        assert_eq!(session.session_id, "cs_test_123");
        assert_eq!(session.redirect_url, "https://checkout.stripe.com/c/pay/cs_test_123");
        let (headers, form) = captured.lock().unwrap().clone().unwrap();
        assert!(headers
            .get("authorization")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("Basic "));
        assert_eq!(
            headers.get("idempotency-key").unwrap(),
            format!("checkout-{}", req.payment_id).as_str()
        );
        assert_eq!(form["metadata[paymentId]"], req.payment_id.to_string());
    }

    #[tokio::test]
    async fn create_checkout_session_maps_provider_error() {
        let (base, _) = spawn_stub(
            StatusCode::BAD_REQUEST,
            serde_json::json!({ "error": { "code": "parameter_invalid", "message": "Invalid currency" } }),
        )
        .await;
        let adapter = StripeCheckoutAdapter::new(test_config().with_base_url(base));

        let err = adapter.create_checkout_session(request()).await.unwrap_err();

        assert_eq!(err.code, GatewayErrorCode::InvalidRequest);
        assert_eq!(err.message, "Invalid currency");
    }

    #[tokio::test]
    async fn unreachable_stripe_is_retryable() {
        let adapter = StripeCheckoutAdapter::new(test_config().with_base_url("http://127.0.0.1:9"));

        let err = adapter.create_checkout_session(request()).await.unwrap_err();

        assert!(err.retryable);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Webhook verification
    // ════════════════════════════════════════════════════════════════════════════

    fn completed_payload(livemode: bool) -> String {
        serde_json::json!({
            "id": "evt_live_1",
            "type": "checkout.session.completed",
            "created": 1704067200,
            "livemode": livemode,
            "data": { "object": {
                "id": "cs_1",
                "payment_status": "paid",
                "metadata": {
                    "paymentId": "7f0b7a4e-5d5b-4a44-9d0e-3b1f3a9c2a10",
                    "buyerId": "buyer-1"
                }
            }}
        })
        .to_string()
    }

    #[test]
    fn verify_webhook_decodes_signed_event() {
        let adapter = StripeCheckoutAdapter::new(test_config());
        let payload = completed_payload(false);

        let event = adapter.verify_webhook(payload.as_bytes(), &signed(&payload)).unwrap();

        assert_eq!(event.provider, PaymentMethod::Stripe);
        assert!(matches!(event.kind, GatewayEventKind::CheckoutCompleted { .. }));
    }

    #[test]
    fn verify_webhook_rejects_bad_signature() {
        let adapter = StripeCheckoutAdapter::new(test_config());
        let payload = completed_payload(false);
        let ts = Timestamp::now().as_unix_secs();
        let header = format!("t={},v1={}", ts, compute_test_signature("whsec_other", ts, &payload));

        let result = adapter.verify_webhook(payload.as_bytes(), &header);

        assert_eq!(result.unwrap_err(), WebhookError::InvalidSignature);
    }

    #[test]
    fn live_endpoint_ignores_test_mode_events() {
        let adapter = StripeCheckoutAdapter::new(test_config().with_require_livemode(true));
        let payload = completed_payload(false);

        let result = adapter.verify_webhook(payload.as_bytes(), &signed(&payload));

        assert!(matches!(result, Err(WebhookError::Ignored(_))));
    }

    #[test]
    fn live_endpoint_accepts_livemode_events() {
        let adapter = StripeCheckoutAdapter::new(test_config().with_require_livemode(true));
        let payload = completed_payload(true);

        assert!(adapter.verify_webhook(payload.as_bytes(), &signed(&payload)).is_ok());
    }
}
