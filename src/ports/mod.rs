//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Payment Ports
//!
//! - `CheckoutGateway` - Hosted checkout and callback authentication per provider
//! - `PaymentRepository` - Payment ledger with compare-and-set settlement
//! - `ProcessedEventLedger` - At-most-once gateway event tracking
//!
//! ## Read Ports
//!
//! - `EnrollmentReader` - Enrollment lookups
//! - `CatalogReader` - Course price and buyer eligibility
//!
//! ## Side-Effect Ports
//!
//! - `RoomMembership` - Course collaboration room participants
//! - `EnrollmentCache` - Cached enrollment listings

mod catalog_reader;
mod checkout_gateway;
mod enrollment_cache;
mod enrollment_reader;
mod payment_repository;
mod processed_event_ledger;
mod room_membership;

pub use catalog_reader::{BuyerSummary, CatalogReader, CourseSummary};
pub use checkout_gateway::{
    CheckoutGateway, CheckoutGateways, CheckoutRequest, CheckoutSession, GatewayError,
    GatewayErrorCode,
};
pub use enrollment_cache::EnrollmentCache;
pub use enrollment_reader::EnrollmentReader;
pub use payment_repository::{PaymentRepository, SettleOutcome, Settlement};
pub use processed_event_ledger::{EventOutcome, ProcessedEvent, ProcessedEventLedger, SaveResult};
pub use room_membership::{RoomJoin, RoomMembership};
