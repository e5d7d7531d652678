//! Course Market - course purchases and payment fulfillment
//!
//! Buyers start a hosted checkout (Stripe or Paymob) for a course. Signed
//! gateway callbacks settle the payment and grant the enrollment exactly
//! once, however often the gateway redelivers.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
