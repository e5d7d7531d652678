//! Paymob intention adapter.

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::payment::PaymentMethod;
use crate::domain::webhook::paymob::{EXTRA_BUYER_ID, EXTRA_PAYMENT_ID};
use crate::domain::webhook::{GatewayEvent, PaymobWebhookVerifier, WebhookError};
use crate::ports::{CheckoutGateway, CheckoutRequest, CheckoutSession, GatewayError, GatewayErrorCode};

/// Placeholder for billing fields Paymob requires but the marketplace does not collect.
const NOT_AVAILABLE: &str = "NA";

/// Paymob API configuration.
#[derive(Clone)]
pub struct PaymobConfig {
    /// Secret key sent as `Authorization: Token <secret>`.
    secret_key: SecretString,

    /// Public key embedded in the unified checkout URL.
    public_key: String,

    /// Secret for callback HMAC verification.
    hmac_secret: SecretString,

    /// Integration ids offered on the checkout page (cards, wallets).
    integration_ids: Vec<i64>,

    /// Base URL (default: https://accept.paymob.com).
    api_base_url: String,

    currency: String,

    /// Server-to-server callback URL, if not set in the Paymob dashboard.
    notification_url: Option<String>,

    /// Where the buyer lands after paying.
    redirection_url: Option<String>,

    request_timeout: Duration,
}

impl PaymobConfig {
    pub fn new(
        secret_key: impl Into<String>,
        public_key: impl Into<String>,
        hmac_secret: impl Into<String>,
        integration_ids: Vec<i64>,
    ) -> Self {
        Self {
            secret_key: SecretString::new(secret_key.into()),
            public_key: public_key.into(),
            hmac_secret: SecretString::new(hmac_secret.into()),
            integration_ids,
            api_base_url: "https://accept.paymob.com".to_string(),
            currency: "EGP".to_string(),
            notification_url: None,
            redirection_url: None,
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_currency(mut self, currency: impl AsRef<str>) -> Self {
        self.currency = currency.as_ref().to_uppercase();
        self
    }

    pub fn with_notification_url(mut self, url: impl Into<String>) -> Self {
        self.notification_url = Some(url.into());
        self
    }

    pub fn with_redirection_url(mut self, url: impl Into<String>) -> Self {
        self.redirection_url = Some(url.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
struct IntentionRequest<'a> {
    amount: i64,
    currency: &'a str,
    payment_methods: &'a [i64],
    items: Vec<IntentionItem<'a>>,
    billing_data: BillingData<'a>,
    extras: serde_json::Value,
    special_reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirection_url: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct IntentionItem<'a> {
    name: &'a str,
    amount: i64,
    quantity: u32,
}

#[derive(Debug, Serialize)]
struct BillingData<'a> {
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    phone_number: &'a str,
}

#[derive(Debug, Deserialize)]
struct IntentionResponse {
    #[serde(default)]
    id: Option<String>,
    client_secret: String,
}

/// Paymob checkout adapter.
pub struct PaymobCheckoutAdapter {
    config: PaymobConfig,
    verifier: PaymobWebhookVerifier,
    http_client: reqwest::Client,
}

impl PaymobCheckoutAdapter {
    pub fn new(config: PaymobConfig) -> Self {
        let verifier = PaymobWebhookVerifier::new(config.hmac_secret.clone());
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

    fn intention<'a>(&'a self, request: &'a CheckoutRequest) -> Result<IntentionRequest<'a>, GatewayError> {
        let amount = amount_cents(request.amount).ok_or_else(|| {
            GatewayError::new(
                GatewayErrorCode::InvalidRequest,
                format!("amount {} cannot be charged", request.amount),
            )
        })?;

        Ok(IntentionRequest {
            amount,
            currency: &self.config.currency,
            payment_methods: &self.config.integration_ids,
            items: vec![IntentionItem {
                name: &request.course_label,
                amount,
                quantity: 1,
            }],
            billing_data: BillingData {
                first_name: NOT_AVAILABLE,
                last_name: NOT_AVAILABLE,
                email: NOT_AVAILABLE,
                phone_number: NOT_AVAILABLE,
            },
            extras: serde_json::json!({
                EXTRA_PAYMENT_ID: request.payment_id.to_string(),
                EXTRA_BUYER_ID: request.buyer_id.to_string(),
            }),
            special_reference: request.payment_id.to_string(),
            notification_url: self.config.notification_url.as_deref(),
            redirection_url: self.config.redirection_url.as_deref(),
        })
    }

    fn checkout_url(&self, client_secret: &str) -> String {
        format!(
            "{}/unifiedcheckout/?publicKey={}&clientSecret={}",
            self.config.api_base_url, self.config.public_key, client_secret
        )
    }
}

fn amount_cents(amount: Decimal) -> Option<i64> {
    if amount <= Decimal::ZERO {
        return None;
    }
    (amount * Decimal::ONE_HUNDRED).round().to_i64()
}

fn error_from_response(status: reqwest::StatusCode, body: &str) -> GatewayError {
    let code = match status.as_u16() {
        401 | 403 => GatewayErrorCode::AuthenticationError,
        429 => GatewayErrorCode::RateLimitExceeded,
        400..=499 => GatewayErrorCode::InvalidRequest,
        _ => GatewayErrorCode::ProviderError,
    };
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| format!("Paymob API error ({})", status));
    GatewayError::new(code, message).with_provider_code(status.as_u16().to_string())
}

#[async_trait]
impl CheckoutGateway for PaymobCheckoutAdapter {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Paymob
    }

    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let url = format!("{}/v1/intention/", self.config.api_base_url);
        let body = self.intention(&request)?;

        let response = self
            .http_client
            .post(&url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Token {}", self.config.secret_key.expose_secret()),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::timeout(e.to_string())
                } else {
                    GatewayError::network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, error = %error_text, "Paymob create intention failed");
            return Err(error_from_response(status, &error_text));
        }

        let intention: IntentionResponse = response.json().await.map_err(|e| {
            GatewayError::provider(format!("Failed to parse Paymob response: {}", e))
        })?;

        Ok(CheckoutSession {
            session_id: intention
                .id
                .unwrap_or_else(|| request.payment_id.to_string()),
            redirect_url: self.checkout_url(&intention.client_secret),
        })
    }

    fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<GatewayEvent, WebhookError> {
        self.verifier.verify_and_decode(payload, signature)
    }
}
