//! Paymob checkout adapter.
//!
//! Implements the `CheckoutGateway` port with Paymob's intention API and
//! unified checkout page. Transaction callbacks are authenticated with
//! HMAC-SHA512 over Paymob's fixed field list.

mod paymob_adapter;

pub use paymob_adapter::{PaymobCheckoutAdapter, PaymobConfig};
