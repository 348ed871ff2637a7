use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BookingId, PaymentId, PaymentStatus, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::{InsertOutcome, PaymentStore, SettleOutcome};
use crate::error::{StoreError, StoreResult};
use crate::payment::Payment;

const PAYMENT_COLUMNS: &str = "id, booking_id, user_id, amount, currency, status, \
     external_session_id, checkout_url, created_at, updated_at";

/// PostgreSQL-backed payment store.
#[derive(Clone)]
pub struct PostgresPaymentStore {
    pool: PgPool,
}

impl PostgresPaymentStore {
    /// Creates a new PostgreSQL payment store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_payment(row: PgRow) -> StoreResult<Payment> {
        let status: String = row.try_get("status")?;
        Ok(Payment {
            id: PaymentId::from_uuid(row.try_get::<Uuid, _>("id")?),
            booking_id: BookingId::from_uuid(row.try_get::<Uuid, _>("booking_id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            amount: row.try_get("amount")?,
            currency: row.try_get("currency")?,
            status: status.parse::<PaymentStatus>()?,
            external_session_id: row.try_get("external_session_id")?,
            checkout_url: row.try_get("checkout_url")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl PaymentStore for PostgresPaymentStore {
    async fn insert_payment(&self, payment: &Payment) -> StoreResult<InsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO payments (id, booking_id, user_id, amount, currency, status,
                                  external_session_id, checkout_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.booking_id.as_uuid())
        .bind(payment.user_id.as_uuid())
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .bind(&payment.external_session_id)
        .bind(&payment.checkout_url)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            // Losing the race on the booking's unique constraint is a duplicate
            Err(sqlx::Error::Database(ref db_err))
                if db_err.constraint() == Some("unique_payment_booking") =>
            {
                Ok(InsertOutcome::DuplicateBooking)
            }
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    async fn find_by_booking(&self, booking_id: BookingId) -> StoreResult<Option<Payment>> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE booking_id = $1"
        ))
        .bind(booking_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_payment).transpose()
    }

    async fn find_by_session(&self, session_id: &str) -> StoreResult<Option<Payment>> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE external_session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_payment).transpose()
    }

    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Payment>> {
        let rows = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_payment).collect()
    }

    async fn settle_pending(
        &self,
        session_id: &str,
        status: PaymentStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<SettleOutcome> {
        let updated = sqlx::query(&format!(
            r#"
            UPDATE payments SET status = $2, updated_at = $3
            WHERE external_session_id = $1 AND status = $4
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(session_id)
        .bind(status.as_str())
        .bind(at)
        .bind(PaymentStatus::Pending.as_str())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = updated {
            return Ok(SettleOutcome::Settled(Self::row_to_payment(row)?));
        }

        match self.find_by_session(session_id).await? {
            Some(payment) => Ok(SettleOutcome::AlreadySettled(payment)),
            None => Ok(SettleOutcome::NotFound),
        }
    }
}
