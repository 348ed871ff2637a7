use async_trait::async_trait;
use chrono::NaiveDate;
use common::{BookingId, BookingStatus, ResourceId, SlotId, SlotStatus, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::{ClaimOutcome, ReservationStore, TransitionOutcome};
use crate::booking::{Booking, NewBooking, TransitionRule};
use crate::error::{StoreError, StoreResult};
use crate::slot::{Slot, SlotKey};

const SLOT_COLUMNS: &str = "id, resource_id, date, start_time, end_time, status, created_at";
const BOOKING_COLUMNS: &str = "id, slot_id, resource_id, user_id, status, created_at";

/// PostgreSQL-backed reservation store.
#[derive(Clone)]
pub struct PostgresReservationStore {
    pool: PgPool,
}

impl PostgresReservationStore {
    /// Creates a new PostgreSQL reservation store.
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

    fn row_to_slot(row: PgRow) -> StoreResult<Slot> {
        let status: String = row.try_get("status")?;
        Ok(Slot {
            id: SlotId::from_uuid(row.try_get::<Uuid, _>("id")?),
            resource_id: ResourceId::from_uuid(row.try_get::<Uuid, _>("resource_id")?),
            date: row.try_get("date")?,
            start_time: row.try_get("start_time")?,
            end_time: row.try_get("end_time")?,
            status: status.parse::<SlotStatus>()?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_booking(row: PgRow) -> StoreResult<Booking> {
        let status: String = row.try_get("status")?;
        Ok(Booking {
            id: BookingId::from_uuid(row.try_get::<Uuid, _>("id")?),
            slot_id: SlotId::from_uuid(row.try_get::<Uuid, _>("slot_id")?),
            resource_id: ResourceId::from_uuid(row.try_get::<Uuid, _>("resource_id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            status: status.parse::<BookingStatus>()?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl ReservationStore for PostgresReservationStore {
    async fn insert_slots(&self, slots: Vec<Slot>) -> StoreResult<usize> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for slot in &slots {
            let result = sqlx::query(
                r#"
                INSERT INTO slots (id, resource_id, date, start_time, end_time, status, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT ON CONSTRAINT unique_slot_key DO NOTHING
                "#,
            )
            .bind(slot.id.as_uuid())
            .bind(slot.resource_id.as_uuid())
            .bind(slot.date)
            .bind(slot.start_time)
            .bind(slot.end_time)
            .bind(slot.status.as_str())
            .bind(slot.created_at)
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn get_slot(&self, slot_id: SlotId) -> StoreResult<Option<Slot>> {
        let row = sqlx::query(&format!("SELECT {SLOT_COLUMNS} FROM slots WHERE id = $1"))
            .bind(slot_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_slot).transpose()
    }

    async fn find_slot(&self, key: &SlotKey) -> StoreResult<Option<Slot>> {
        let row = sqlx::query(&format!(
            "SELECT {SLOT_COLUMNS} FROM slots WHERE resource_id = $1 AND date = $2 AND start_time = $3"
        ))
        .bind(key.resource_id.as_uuid())
        .bind(key.date)
        .bind(key.start_time)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_slot).transpose()
    }

    async fn list_slots(
        &self,
        resource_id: ResourceId,
        date: NaiveDate,
        status: Option<SlotStatus>,
    ) -> StoreResult<Vec<Slot>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {SLOT_COLUMNS} FROM slots
            WHERE resource_id = $1 AND date = $2 AND ($3::TEXT IS NULL OR status = $3)
            ORDER BY start_time ASC
            "#
        ))
        .bind(resource_id.as_uuid())
        .bind(date)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_slot).collect()
    }

    async fn list_slots_by_date(&self, date: NaiveDate) -> StoreResult<Vec<Slot>> {
        let rows = sqlx::query(&format!(
            "SELECT {SLOT_COLUMNS} FROM slots WHERE date = $1 ORDER BY resource_id ASC, start_time ASC"
        ))
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_slot).collect()
    }

    async fn claim_slot(&self, key: &SlotKey, booking: NewBooking) -> StoreResult<ClaimOutcome> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes competing claims for the same slot
        let row = sqlx::query(&format!(
            r#"
            SELECT {SLOT_COLUMNS} FROM slots
            WHERE resource_id = $1 AND date = $2 AND start_time = $3
            FOR UPDATE
            "#
        ))
        .bind(key.resource_id.as_uuid())
        .bind(key.date)
        .bind(key.start_time)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(ClaimOutcome::SlotMissing);
        };
        let mut slot = Self::row_to_slot(row)?;

        if !slot.is_available() {
            return Ok(ClaimOutcome::SlotUnavailable(slot));
        }

        let confirmed_exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM bookings WHERE slot_id = $1 AND status = $2)",
        )
        .bind(slot.id.as_uuid())
        .bind(BookingStatus::Confirmed.as_str())
        .fetch_one(&mut *tx)
        .await?;

        if confirmed_exists {
            return Ok(ClaimOutcome::AlreadyBooked(slot));
        }

        let booking = booking.into_booking(&slot);

        sqlx::query(
            r#"
            INSERT INTO bookings (id, slot_id, resource_id, user_id, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(booking.id.as_uuid())
        .bind(booking.slot_id.as_uuid())
        .bind(booking.resource_id.as_uuid())
        .bind(booking.user_id.as_uuid())
        .bind(booking.status.as_str())
        .bind(booking.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE slots SET status = $2 WHERE id = $1")
            .bind(slot.id.as_uuid())
            .bind(SlotStatus::Booked.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        slot.status = SlotStatus::Booked;
        Ok(ClaimOutcome::Claimed { slot, booking })
    }

    async fn release_slot(&self, slot_id: SlotId) -> StoreResult<Option<Slot>> {
        let row = sqlx::query(&format!(
            "UPDATE slots SET status = $2 WHERE id = $1 RETURNING {SLOT_COLUMNS}"
        ))
        .bind(slot_id.as_uuid())
        .bind(SlotStatus::Available.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_slot).transpose()
    }

    async fn delete_unreferenced_slots_before(&self, date: NaiveDate) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM slots s
            WHERE s.date < $1
              AND s.status = $2
              AND NOT EXISTS (SELECT 1 FROM bookings b WHERE b.slot_id = s.id)
            "#,
        )
        .bind(date)
        .bind(SlotStatus::Available.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn get_booking(&self, booking_id: BookingId) -> StoreResult<Option<Booking>> {
        let row = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(booking_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_booking).transpose()
    }

    async fn list_bookings_by_user(&self, user_id: UserId) -> StoreResult<Vec<Booking>> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_booking).collect()
    }

    async fn transition_booking(
        &self,
        booking_id: BookingId,
        rule: TransitionRule,
    ) -> StoreResult<TransitionOutcome> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1 FOR UPDATE"
        ))
        .bind(booking_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(TransitionOutcome::NotFound);
        };
        let mut booking = Self::row_to_booking(row)?;

        if !rule.permits(booking.status) {
            return Ok(TransitionOutcome::Rejected { booking });
        }

        sqlx::query("UPDATE bookings SET status = $2 WHERE id = $1")
            .bind(booking_id.as_uuid())
            .bind(rule.to.as_str())
            .execute(&mut *tx)
            .await?;

        let slot_row = if rule.releases_slot() {
            sqlx::query(&format!(
                "UPDATE slots SET status = $2 WHERE id = $1 RETURNING {SLOT_COLUMNS}"
            ))
            .bind(booking.slot_id.as_uuid())
            .bind(SlotStatus::Available.as_str())
            .fetch_optional(&mut *tx)
            .await?
        } else {
            sqlx::query(&format!("SELECT {SLOT_COLUMNS} FROM slots WHERE id = $1"))
                .bind(booking.slot_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?
        };

        let slot_row = slot_row.ok_or(StoreError::MissingSlot(booking.slot_id))?;
        let slot = Self::row_to_slot(slot_row)?;

        tx.commit().await?;

        booking.status = rule.to;
        Ok(TransitionOutcome::Applied { booking, slot })
    }
}
