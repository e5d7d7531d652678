//! Payment domain module.
//!
//! Purchase attempts, their lifecycle, and the enrollment grant a
//! successful purchase produces.
//!
//! # Module Structure
//!
//! - `aggregate` - Payment aggregate (one purchase attempt)
//! - `status` - PaymentStatus state machine
//! - `method` - Supported payment providers
//! - `enrollment` - Enrollment access grant
//! - `errors` - User-facing payment errors

mod aggregate;
mod enrollment;
mod errors;
mod method;
mod status;

pub use aggregate::Payment;
pub use enrollment::Enrollment;
pub use errors::PaymentError;
pub use method::PaymentMethod;
pub use status::PaymentStatus;
