//! Stripe checkout adapter.
//!
//! Implements the `CheckoutGateway` port for Stripe, including:
//! - Checkout sessions in `payment` mode
//! - Webhook signature verification and event decoding
//!
//! # Security
//!
//! - Webhook signatures use HMAC-SHA256 with constant-time comparison
//! - Timestamps are validated to prevent replay attacks (5-minute window)
//! - All secrets are handled via `secrecy::SecretString`
//!
//! # Configuration
//!
//! Required environment variables:
//! - `COURSE_MARKET__PAYMENT__STRIPE_API_KEY`: Stripe secret API key
//! - `COURSE_MARKET__PAYMENT__STRIPE_WEBHOOK_SECRET`: Webhook signing secret (whsec_...)

mod mock_checkout_gateway;
mod stripe_adapter;

pub use mock_checkout_gateway::MockCheckoutGateway;
pub use stripe_adapter::{StripeCheckoutAdapter, StripeConfig};
