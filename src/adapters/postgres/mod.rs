//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresPaymentRepository` - Payment ledger with transactional settlement
//! - `PostgresProcessedEventLedger` - Processed gateway event ids
//! - `PostgresEnrollmentReader` - Enrollment queries
//! - `PostgresCatalogReader` - Course price and buyer verification lookups
//! - `PostgresRoomMembership` - Course room participant rows

mod catalog_reader;
mod enrollment_reader;
mod payment_repository;
mod processed_event_ledger;
mod room_membership;

pub use catalog_reader::PostgresCatalogReader;
pub use enrollment_reader::PostgresEnrollmentReader;
pub use payment_repository::PostgresPaymentRepository;
pub use processed_event_ledger::PostgresProcessedEventLedger;
pub use room_membership::PostgresRoomMembership;
