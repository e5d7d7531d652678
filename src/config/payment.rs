//! Payment gateway configuration (Stripe, optional Paymob)

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Payment configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe secret API key
    pub stripe_api_key: SecretString,

    /// Stripe webhook signing secret
    pub stripe_webhook_secret: SecretString,

    #[serde(default = "default_stripe_api_base_url")]
    pub stripe_api_base_url: String,

    /// Act only on livemode Stripe events
    #[serde(default)]
    pub stripe_require_livemode: bool,

    /// ISO 4217 code used for every checkout
    #[serde(default = "default_currency")]
    pub currency: String,

    pub paymob_secret_key: Option<SecretString>,
    pub paymob_public_key: Option<String>,
    pub paymob_hmac_secret: Option<SecretString>,

    /// Comma-separated Paymob integration ids
    pub paymob_integration_ids: Option<String>,

    #[serde(default = "default_paymob_api_base_url")]
    pub paymob_api_base_url: String,

    /// Public URL of `POST /webhook/paymob`; when unset Paymob falls back
    /// to the callback configured on the integration
    pub paymob_notification_url: Option<String>,

    /// Upper bound on a checkout-session call to a gateway
    #[serde(default = "default_gateway_timeout")]
    pub gateway_timeout_secs: u64,

    /// Maximum age of a signed Stripe webhook
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_secs: i64,

    #[serde(default = "default_retention_days")]
    pub processed_event_retention_days: i64,
}

/// Paymob credentials, present only when every field is configured.
#[derive(Debug, Clone)]
pub struct PaymobSettings {
    pub secret_key: SecretString,
    pub public_key: String,
    pub hmac_secret: SecretString,
    pub integration_ids: Vec<i64>,
    pub api_base_url: String,
    pub notification_url: Option<String>,
}

impl PaymentConfig {
    /// Minimal Stripe-only configuration with defaults for everything else.
    pub fn stripe_only(api_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            stripe_api_key: SecretString::new(api_key.into()),
            stripe_webhook_secret: SecretString::new(webhook_secret.into()),
            stripe_api_base_url: default_stripe_api_base_url(),
            stripe_require_livemode: false,
            currency: default_currency(),
            paymob_secret_key: None,
            paymob_public_key: None,
            paymob_hmac_secret: None,
            paymob_integration_ids: None,
            paymob_api_base_url: default_paymob_api_base_url(),
            paymob_notification_url: None,
            gateway_timeout_secs: default_gateway_timeout(),
            webhook_tolerance_secs: default_webhook_tolerance(),
            processed_event_retention_days: default_retention_days(),
        }
    }

    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.expose_secret().starts_with("sk_test_")
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }

    /// Paymob settings, or `None` when Paymob is not configured.
    ///
    /// Fails when only some of the Paymob fields are set.
    pub fn paymob(&self) -> Result<Option<PaymobSettings>, ValidationError> {
        let any_set = self.paymob_secret_key.is_some()
            || self.paymob_public_key.is_some()
            || self.paymob_hmac_secret.is_some()
            || self.paymob_integration_ids.is_some();
        if !any_set {
            return Ok(None);
        }

        let secret_key = self
            .paymob_secret_key
            .clone()
            .ok_or(ValidationError::IncompletePaymob("PAYMOB_SECRET_KEY"))?;
        let public_key = self
            .paymob_public_key
            .clone()
            .ok_or(ValidationError::IncompletePaymob("PAYMOB_PUBLIC_KEY"))?;
        let hmac_secret = self
            .paymob_hmac_secret
            .clone()
            .ok_or(ValidationError::IncompletePaymob("PAYMOB_HMAC_SECRET"))?;
        let raw_ids = self
            .paymob_integration_ids
            .as_deref()
            .ok_or(ValidationError::IncompletePaymob("PAYMOB_INTEGRATION_IDS"))?;

        let integration_ids = raw_ids
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<i64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ValidationError::InvalidPaymobIntegrationIds)?;
        if integration_ids.is_empty() {
            return Err(ValidationError::InvalidPaymobIntegrationIds);
        }

        let notification_url = self.paymob_notification_url.clone();
        if let Some(url) = &notification_url {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(ValidationError::InvalidPaymobNotificationUrl);
            }
        }

        Ok(Some(PaymobSettings {
            secret_key,
            public_key,
            hmac_secret,
            integration_ids,
            api_base_url: self.paymob_api_base_url.clone(),
            notification_url,
        }))
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let api_key = self.stripe_api_key.expose_secret();
        let webhook_secret = self.stripe_webhook_secret.expose_secret();

        if api_key.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_API_KEY"));
        }
        if webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_WEBHOOK_SECRET"));
        }
        if !api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidCurrency);
        }
        if self.gateway_timeout_secs == 0 || self.gateway_timeout_secs > 60 {
            return Err(ValidationError::InvalidGatewayTimeout);
        }
        if self.webhook_tolerance_secs <= 0 {
            return Err(ValidationError::InvalidWebhookTolerance);
        }
        if self.processed_event_retention_days < 1 {
            return Err(ValidationError::InvalidRetention);
        }

        self.paymob()?;
        Ok(())
    }
}

fn default_stripe_api_base_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_paymob_api_base_url() -> String {
    "https://accept.paymob.com".to_string()
}

fn default_currency() -> String {
    "EGP".to_string()
}

fn default_gateway_timeout() -> u64 {
    10
}

fn default_webhook_tolerance() -> i64 {
    300
}

fn default_retention_days() -> i64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stripe() -> PaymentConfig {
        PaymentConfig::stripe_only("sk_test_xxx", "whsec_xxx")
    }

    fn with_paymob() -> PaymentConfig {
        PaymentConfig {
            paymob_secret_key: Some(SecretString::new("egy_sk_test_xxx".to_string())),
            paymob_public_key: Some("egy_pk_test_xxx".to_string()),
            paymob_hmac_secret: Some(SecretString::new("hmac".to_string())),
            paymob_integration_ids: Some("4512, 4513".to_string()),
            ..stripe()
        }
    }

    #[test]
    fn test_defaults() {
        let config = stripe();
        assert_eq!(config.currency, "EGP");
        assert_eq!(config.gateway_timeout(), Duration::from_secs(10));
        assert_eq!(config.webhook_tolerance_secs, 300);
        assert_eq!(config.processed_event_retention_days, 30);
        assert!(!config.stripe_require_livemode);
        assert!(config.is_test_mode());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_missing_api_key() {
        let config = PaymentConfig::stripe_only("", "whsec_xxx");
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("STRIPE_API_KEY"))
        );
    }

    #[test]
    fn test_validation_invalid_api_key_prefix() {
        let config = PaymentConfig::stripe_only("pk_test_xxx", "whsec_xxx");
        assert_eq!(config.validate(), Err(ValidationError::InvalidStripeKey));
    }

    #[test]
    fn test_validation_invalid_webhook_secret_prefix() {
        let config = PaymentConfig::stripe_only("sk_test_xxx", "secret_xxx");
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidStripeWebhookSecret)
        );
    }

    #[test]
    fn test_validation_zero_gateway_timeout() {
        let config = PaymentConfig {
            gateway_timeout_secs: 0,
            ..stripe()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidGatewayTimeout));
    }

    #[test]
    fn test_validation_bad_currency() {
        let config = PaymentConfig {
            currency: "EURO".to_string(),
            ..stripe()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidCurrency));
    }

    #[test]
    fn test_paymob_disabled_when_absent() {
        assert!(stripe().paymob().unwrap().is_none());
    }

    #[test]
    fn test_paymob_settings_parse_integration_ids() {
        let settings = with_paymob().paymob().unwrap().unwrap();
        assert_eq!(settings.integration_ids, vec![4512, 4513]);
        assert_eq!(settings.public_key, "egy_pk_test_xxx");
        assert_eq!(settings.api_base_url, "https://accept.paymob.com");
    }

    #[test]
    fn test_paymob_notification_url_is_carried_and_checked() {
        assert!(with_paymob().paymob().unwrap().unwrap().notification_url.is_none());

        let config = PaymentConfig {
            paymob_notification_url: Some("https://api.courses.example/webhook/paymob".to_string()),
            ..with_paymob()
        };
        assert_eq!(
            config.paymob().unwrap().unwrap().notification_url.as_deref(),
            Some("https://api.courses.example/webhook/paymob")
        );

        let config = PaymentConfig {
            paymob_notification_url: Some("api.courses.example/webhook/paymob".to_string()),
            ..with_paymob()
        };
        assert_eq!(
            config.paymob().unwrap_err(),
            ValidationError::InvalidPaymobNotificationUrl
        );
    }

    #[test]
    fn test_partial_paymob_is_rejected() {
        let config = PaymentConfig {
            paymob_hmac_secret: None,
            ..with_paymob()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::IncompletePaymob("PAYMOB_HMAC_SECRET"))
        );
    }

    #[test]
    fn test_non_numeric_integration_id_is_rejected() {
        let config = PaymentConfig {
            paymob_integration_ids: Some("4512,cards".to_string()),
            ..with_paymob()
        };
        assert_eq!(
            config.paymob().unwrap_err(),
            ValidationError::InvalidPaymobIntegrationIds
        );
    }
}
