//! Adapters - Implementations of port interfaces.
//!
//! - `stripe`, `paymob` - Hosted checkout gateways and webhook verification
//! - `postgres` - Payment ledger, enrollments, catalog lookups, room membership
//! - `redis` - Enrollment read cache
//! - `memory` - In-process implementations for development and tests
//! - `http` - Axum routes

pub mod http;
pub mod memory;
pub mod paymob;
pub mod postgres;
pub mod redis;
pub mod stripe;
