//! In-memory adapters for development and testing.
//!
//! Same semantics as the Postgres adapters (compare-and-set settlement,
//! idempotent enrollment and event recording) on a single process.
//! Not suitable for multi-server deployments.

mod catalog;
mod enrollment_cache;
mod payment_store;
mod room_membership;

pub use catalog::InMemoryCatalog;
pub use enrollment_cache::{InMemoryEnrollmentCache, NoopEnrollmentCache};
pub use payment_store::InMemoryPaymentStore;
pub use room_membership::InMemoryRoomMembership;
