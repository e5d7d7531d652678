//! Domain layer - pure business logic with no infrastructure dependencies.
//!
//! - `foundation` - shared identifiers, errors and the state machine trait
//! - `payment` - purchase attempts and enrollment grants
//! - `webhook` - authentication and decoding of provider notifications

pub mod foundation;
pub mod payment;
pub mod webhook;
