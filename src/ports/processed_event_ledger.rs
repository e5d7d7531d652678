//! ProcessedEventLedger port - at-most-once tracking of gateway events.
//!
//! Providers deliver callbacks at least once, sometimes concurrently.
//! Every event that finishes processing is recorded here under its
//! provider-namespaced event id, and a recorded event is never
//! processed again.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::webhook::GatewayEvent;

/// How processing of an event ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// The event changed a payment.
    Applied,
    /// Nothing to do: unhandled type or payment already settled.
    Ignored,
    /// The event contradicts the ledger (unknown payment, late success).
    Anomaly,
}

impl EventOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventOutcome::Applied => "applied",
            EventOutcome::Ignored => "ignored",
            EventOutcome::Anomaly => "anomaly",
        }
    }
}

/// Record of a processed gateway event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedEvent {
    /// Provider-namespaced event id (see `GatewayEvent::ledger_key`).
    pub event_key: String,
    pub event_type: String,
    pub outcome: EventOutcome,

    /// Reason for an ignored or anomalous outcome.
    pub detail: Option<String>,

    pub processed_at: Timestamp,
}

impl ProcessedEvent {
    pub fn applied(event: &GatewayEvent) -> Self {
        Self::new(event, EventOutcome::Applied, None)
    }

    pub fn ignored(event: &GatewayEvent, reason: impl Into<String>) -> Self {
        Self::new(event, EventOutcome::Ignored, Some(reason.into()))
    }

    pub fn anomaly(event: &GatewayEvent, reason: impl Into<String>) -> Self {
        Self::new(event, EventOutcome::Anomaly, Some(reason.into()))
    }

    fn new(event: &GatewayEvent, outcome: EventOutcome, detail: Option<String>) -> Self {
        Self {
            event_key: event.ledger_key(),
            event_type: event.event_type.clone(),
            outcome,
            detail,
            processed_at: Timestamp::now(),
        }
    }
}

/// Result of attempting to record an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// First time seeing this event.
    Inserted,
    /// Another delivery recorded it first.
    AlreadyExists,
}

/// Port for the processed-event ledger.
///
/// Implementations rely on a primary key over `event_key` so concurrent
/// deliveries cannot both insert.
#[async_trait]
pub trait ProcessedEventLedger: Send + Sync {
    /// Returns true if the event has already been processed.
    async fn contains(&self, event_key: &str) -> Result<bool, DomainError>;

    /// Record a processed event with `ON CONFLICT DO NOTHING` semantics.
    async fn record(&self, event: ProcessedEvent) -> Result<SaveResult, DomainError>;

    /// Delete records processed before `cutoff`. Returns the count deleted.
    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError>;
}
