//! PostgreSQL implementation of ProcessedEventLedger.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{ProcessedEvent, ProcessedEventLedger, SaveResult};

pub struct PostgresProcessedEventLedger {
    pool: PgPool,
}

impl PostgresProcessedEventLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProcessedEventLedger for PostgresProcessedEventLedger {
    async fn contains(&self, event_key: &str) -> Result<bool, DomainError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM processed_webhook_events WHERE event_id = $1)",
        )
        .bind(event_key)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to check processed event: {}", e)))?;

        Ok(exists)
    }

    async fn record(&self, event: ProcessedEvent) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO processed_webhook_events (event_id, event_type, outcome, detail, processed_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(&event.event_key)
        .bind(&event.event_type)
        .bind(event.outcome.as_str())
        .bind(&event.detail)
        .bind(event.processed_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to record processed event: {}", e)))?;

        Ok(if result.rows_affected() == 1 {
            SaveResult::Inserted
        } else {
            SaveResult::AlreadyExists
        })
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM processed_webhook_events WHERE processed_at < $1")
            .bind(cutoff.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to prune processed events: {}", e)))?;

        Ok(result.rows_affected())
    }
}
