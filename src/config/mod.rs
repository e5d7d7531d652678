//! Application configuration module
//!
//! Configuration is read from environment variables with the
//! `COURSE_MARKET` prefix; nested values are separated by `__`.
//!
//! # Example
//!
//! ```no_run
//! use course_market::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod error;
mod payment;
mod server;
mod storage;

pub use error::{ConfigError, ValidationError};
pub use payment::{PaymentConfig, PaymobSettings};
pub use server::{Environment, ServerConfig};
pub use storage::{DatabaseConfig, RedisConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    pub database: DatabaseConfig,

    /// Enrollment cache; `None` runs without caching
    #[serde(default)]
    pub redis: Option<RedisConfig>,

    pub payment: PaymentConfig,
}

impl AppConfig {
    /// Load configuration from the environment (and `.env` when present).
    ///
    /// - `COURSE_MARKET__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `COURSE_MARKET__PAYMENT__STRIPE_API_KEY=...` -> `payment.stripe_api_key`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or cannot be
    /// parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("COURSE_MARKET")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate every section; the first failure wins.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        if let Some(redis) = &self.redis {
            redis.validate()?;
        }
        self.payment.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
