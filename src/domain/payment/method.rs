//! Supported payment providers.

use crate::domain::foundation::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Payment provider a purchase is routed through.
///
/// Chosen at initiation and stored on the payment, so webhook handling
/// never needs to re-select a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Stripe,
    Paymob,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 2] = [PaymentMethod::Stripe, PaymentMethod::Paymob];

    /// Returns the storage and wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Stripe => "stripe",
            PaymentMethod::Paymob => "paymob",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stripe" => Ok(PaymentMethod::Stripe),
            "paymob" => Ok(PaymentMethod::Paymob),
            "" => Err(ValidationError::empty_field("payment_method")),
            other => Err(ValidationError::invalid_format(
                "payment_method",
                format!("unsupported payment method '{}'", other),
            )),
        }
    }
}
