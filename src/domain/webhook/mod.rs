//! Webhook domain module.
//!
//! Authentication and decoding of inbound payment-provider notifications
//! into typed gateway events.
//!
//! # Module Structure
//!
//! - `errors` - WebhookError taxonomy with HTTP status mapping
//! - `event` - Provider-neutral GatewayEvent
//! - `stripe` - Stripe-Signature verification and event decoding
//! - `paymob` - Paymob HMAC verification and transaction decoding

mod errors;
mod event;
pub mod paymob;
pub mod stripe;

pub use errors::WebhookError;
pub use event::{GatewayEvent, GatewayEventKind};
pub use paymob::PaymobWebhookVerifier;
pub use stripe::{SignatureHeader, StripeEvent, StripeWebhookVerifier};

#[cfg(test)]
pub use stripe::compute_test_signature;
