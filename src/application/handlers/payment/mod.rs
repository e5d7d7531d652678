//! Payment handlers.
//!
//! ## Commands
//! - Initiating a purchase through a hosted checkout
//! - Cancelling a pending payment
//! - Ingesting gateway callbacks and applying fulfillment
//! - Pruning the processed-event ledger
//!
//! ## Queries
//! - Payment status for the buyer
//! - A buyer's payment history
//! - A user's enrollments

mod cancel_payment;
mod fulfill_payment;
mod get_payment_status;
mod ingest_webhook;
mod initiate_payment;
mod list_enrollments;
mod list_user_payments;
mod prune_processed_events;

// Commands
pub use cancel_payment::{CancelPaymentCommand, CancelPaymentHandler, CancelPaymentResult};
pub use fulfill_payment::{FulfillmentOrchestrator, FulfillmentOutcome};
pub use ingest_webhook::{IngestWebhookCommand, IngestWebhookHandler, IngestWebhookResult};
pub use initiate_payment::{InitiatePaymentCommand, InitiatePaymentHandler, InitiatePaymentResult};
pub use prune_processed_events::{PruneProcessedEventsCommand, PruneProcessedEventsHandler};

// Queries
pub use get_payment_status::{GetPaymentStatusHandler, GetPaymentStatusQuery};
pub use list_enrollments::{ListEnrollmentsHandler, ListEnrollmentsQuery};
pub use list_user_payments::{ListUserPaymentsHandler, ListUserPaymentsQuery};
