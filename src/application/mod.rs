//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Following CQRS, it separates command handlers (write) from query handlers (read).

pub mod handlers;

pub use handlers::payment::{
    CancelPaymentCommand, CancelPaymentHandler, CancelPaymentResult, FulfillmentOrchestrator,
    FulfillmentOutcome, GetPaymentStatusHandler, GetPaymentStatusQuery, IngestWebhookCommand,
    IngestWebhookHandler, IngestWebhookResult, InitiatePaymentCommand, InitiatePaymentHandler,
    InitiatePaymentResult, ListEnrollmentsHandler, ListEnrollmentsQuery, ListUserPaymentsHandler,
    ListUserPaymentsQuery, PruneProcessedEventsCommand, PruneProcessedEventsHandler,
};
