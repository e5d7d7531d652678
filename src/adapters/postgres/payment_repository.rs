//! PostgreSQL implementation of PaymentRepository.
//!
//! `settle` runs the status compare-and-set, the enrollment insert and the
//! processed-event insert in one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::foundation::{
    CourseId, DomainError, ErrorCode, PaymentId, Timestamp, UserId,
};
use crate::domain::payment::{Enrollment, Payment, PaymentMethod, PaymentStatus};
use crate::ports::{PaymentRepository, ProcessedEvent, SettleOutcome, Settlement};

/// Partial unique index on (buyer_id, course_id) where status = 'pending'.
const PENDING_UNIQUE_INDEX: &str = "payments_one_pending_per_buyer_course";

/// Partial unique index on (buyer_id, course_id) where status = 'successful'.
const SUCCESSFUL_UNIQUE_INDEX: &str = "payments_one_successful_per_buyer_course";

const PAYMENT_COLUMNS: &str = "id, buyer_id, course_id, amount, status, payment_method, \
                               transaction_ref, created_at, updated_at";

/// PostgreSQL implementation of the PaymentRepository port.
pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a payment.
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    buyer_id: String,
    course_id: Uuid,
    amount: Decimal,
    status: String,
    payment_method: String,
    transaction_ref: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let status: PaymentStatus = row.status.parse().map_err(|_| {
            DomainError::database(format!("Invalid payment status: {}", row.status))
        })?;
        let method: PaymentMethod = row.payment_method.parse().map_err(|_| {
            DomainError::database(format!("Invalid payment method: {}", row.payment_method))
        })?;
        let buyer_id = UserId::new(row.buyer_id)
            .map_err(|e| DomainError::database(format!("Invalid buyer_id: {}", e)))?;

        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            buyer_id,
            course_id: CourseId::from_uuid(row.course_id),
            amount: row.amount,
            status,
            method,
            transaction_ref: row.transaction_ref,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

/// Maps an insert failure, recognising the one-open-payment indexes.
fn map_insert_error(e: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db_err) = &e {
        match db_err.constraint() {
            Some(PENDING_UNIQUE_INDEX) => {
                return DomainError::new(
                    ErrorCode::PaymentPending,
                    "A payment for this course is already in progress",
                )
            }
            Some(SUCCESSFUL_UNIQUE_INDEX) => {
                return DomainError::new(ErrorCode::AlreadyPurchased, "Course already purchased")
            }
            _ => {}
        }
    }
    DomainError::database(format!("Failed to insert payment: {}", e))
}

async fn insert_enrollment(
    tx: &mut Transaction<'_, Postgres>,
    enrollment: &Enrollment,
) -> Result<bool, DomainError> {
    let result = sqlx::query(
        r#"
        INSERT INTO enrollments (id, user_id, course_id, payment_id, enrolled_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(enrollment.id.as_uuid())
    .bind(enrollment.user_id.as_str())
    .bind(enrollment.course_id.as_uuid())
    .bind(enrollment.payment_id.as_uuid())
    .bind(enrollment.enrolled_at.as_datetime())
    .execute(&mut **tx)
    .await
    .map_err(|e| DomainError::database(format!("Failed to insert enrollment: {}", e)))?;

    Ok(result.rows_affected() == 1)
}

async fn insert_processed_event(
    tx: &mut Transaction<'_, Postgres>,
    event: &ProcessedEvent,
) -> Result<(), DomainError> {
    sqlx::query(
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
    .execute(&mut **tx)
    .await
    .map_err(|e| DomainError::database(format!("Failed to record processed event: {}", e)))?;

    Ok(())
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn insert(&self, payment: &Payment) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, buyer_id, course_id, amount, status, payment_method,
                transaction_ref, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.buyer_id.as_str())
        .bind(payment.course_id.as_uuid())
        .bind(payment.amount)
        .bind(payment.status.as_str())
        .bind(payment.method.as_str())
        .bind(&payment.transaction_ref)
        .bind(payment.created_at.as_datetime())
        .bind(payment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(map_insert_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE id = $1",
            PAYMENT_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch payment: {}", e)))?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_open_for(
        &self,
        buyer_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM payments
            WHERE buyer_id = $1 AND course_id = $2 AND status IN ('pending', 'successful')
            ORDER BY (status = 'successful') DESC, created_at DESC
            LIMIT 1
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(buyer_id.as_str())
        .bind(course_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch open payment: {}", e)))?;

        row.map(Payment::try_from).transpose()
    }

    async fn list_by_buyer(&self, buyer_id: &UserId) -> Result<Vec<Payment>, DomainError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE buyer_id = $1 ORDER BY created_at DESC",
            PAYMENT_COLUMNS
        ))
        .bind(buyer_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list payments: {}", e)))?;

        rows.into_iter().map(Payment::try_from).collect()
    }

    async fn settle(&self, settlement: Settlement) -> Result<SettleOutcome, DomainError> {
        if settlement.target == PaymentStatus::Pending {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                "cannot settle a payment into pending",
            ));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database(format!("Failed to start transaction: {}", e)))?;

        let updated: Option<PaymentRow> = sqlx::query_as(&format!(
            r#"
            UPDATE payments
            SET status = $2,
                transaction_ref = COALESCE($3, transaction_ref),
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(settlement.payment_id.as_uuid())
        .bind(settlement.target.as_str())
        .bind(&settlement.transaction_ref)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to settle payment: {}", e)))?;

        let Some(row) = updated else {
            // Lost the compare-and-set, or no such payment. Nothing was written.
            let current: Option<PaymentRow> = sqlx::query_as(&format!(
                "SELECT {} FROM payments WHERE id = $1",
                PAYMENT_COLUMNS
            ))
            .bind(settlement.payment_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| DomainError::database(format!("Failed to fetch payment: {}", e)))?;

            return match current {
                Some(row) => Ok(SettleOutcome::NotPending(Payment::try_from(row)?)),
                None => Ok(SettleOutcome::NotFound),
            };
        };

        if let Some(enrollment) = &settlement.grant {
            if !insert_enrollment(&mut tx, enrollment).await? {
                tracing::debug!(
                    payment_id = %settlement.payment_id,
                    "Enrollment already present for buyer and course"
                );
            }
        }
        if let Some(event) = &settlement.processed_event {
            insert_processed_event(&mut tx, event).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit transaction: {}", e)))?;

        Ok(SettleOutcome::Applied(Payment::try_from(row)?))
    }
}
