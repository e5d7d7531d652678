//! PruneProcessedEventsHandler - Housekeeping for the processed-event ledger.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::ProcessedEventLedger;

#[derive(Debug, Clone, Copy)]
pub struct PruneProcessedEventsCommand {
    pub retention_days: i64,
}

/// Deletes ledger entries older than the retention window.
///
/// Providers stop redelivering after a few days, so entries past the
/// window can no longer gate a duplicate.
pub struct PruneProcessedEventsHandler {
    ledger: Arc<dyn ProcessedEventLedger>,
}

impl PruneProcessedEventsHandler {
    pub fn new(ledger: Arc<dyn ProcessedEventLedger>) -> Self {
        Self { ledger }
    }

    pub async fn handle(&self, cmd: PruneProcessedEventsCommand) -> Result<u64, DomainError> {
        let cutoff = Timestamp::now().minus_days(cmd.retention_days);
        self.ledger.delete_before(cutoff).await
    }
}
