//! Configuration errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("configuration rejected: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// A loaded value that the service refuses to start with.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must be set")]
    MissingRequired(&'static str),

    // server
    #[error("server.port must be non-zero")]
    InvalidPort,
    #[error("server.request_timeout_secs must be within 1..=300")]
    InvalidTimeout,
    #[error("server.frontend_url must be an http(s) origin")]
    InvalidFrontendUrl,

    // storage
    #[error("database.url must use the postgres:// scheme")]
    InvalidDatabaseUrl,
    #[error("redis.url must use the redis:// or rediss:// scheme")]
    InvalidRedisUrl,
    #[error("database pool needs 0 < min_connections <= max_connections")]
    InvalidPoolSize,
    #[error("database.max_connections is capped at 100")]
    PoolSizeTooLarge,

    // payment
    #[error("payment.stripe_api_key must start with sk_")]
    InvalidStripeKey,
    #[error("payment.stripe_webhook_secret must start with whsec_")]
    InvalidStripeWebhookSecret,
    #[error("payment.currency must be a three-letter ISO code")]
    InvalidCurrency,
    #[error("payment.gateway_timeout_secs must be within 1..=60")]
    InvalidGatewayTimeout,
    #[error("payment.webhook_tolerance_secs must be positive")]
    InvalidWebhookTolerance,
    #[error("payment.processed_event_retention_days must be at least 1")]
    InvalidRetention,
    #[error("Paymob is partially configured: {0} is missing")]
    IncompletePaymob(&'static str),
    #[error("payment.paymob_integration_ids must be a comma-separated list of integers")]
    InvalidPaymobIntegrationIds,
    #[error("payment.paymob_notification_url must be an http(s) URL")]
    InvalidPaymobNotificationUrl,
}
