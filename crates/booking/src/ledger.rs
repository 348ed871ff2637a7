//! Slot ledger: the authoritative inventory of reservable slots.

use chrono::{NaiveDate, NaiveTime};
use common::{ResourceId, SlotId, SlotStatus};

use crate::booking::{Booking, NewBooking};
use crate::error::{BookingError, Result};
use crate::slot::{Slot, SlotKey, slot_windows};
use crate::store::{ClaimOutcome, ReservationStore};

/// Owns slot state. Every slot mutation goes through here.
#[derive(Clone)]
pub struct SlotLedger<S> {
    store: S,
}

impl<S: ReservationStore> SlotLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Atomically claims the slot at `(resource_id, date, start_time)` for a
    /// new booking.
    ///
    /// Fails with [`BookingError::SlotNotFound`] if no slot exists there and
    /// with [`BookingError::Conflict`] if it is not AVAILABLE or a CONFIRMED
    /// booking already references it.
    #[tracing::instrument(skip(self, booking), fields(booking_id = %booking.id))]
    pub async fn claim(
        &self,
        resource_id: ResourceId,
        date: NaiveDate,
        start_time: NaiveTime,
        booking: NewBooking,
    ) -> Result<(Slot, Booking)> {
        let key = SlotKey::new(resource_id, date, start_time);

        match self.store.claim_slot(&key, booking).await? {
            ClaimOutcome::Claimed { slot, booking } => Ok((slot, booking)),
            ClaimOutcome::SlotMissing => Err(BookingError::SlotNotFound {
                resource_id,
                date,
                start_time,
            }),
            ClaimOutcome::SlotUnavailable(slot) => {
                metrics::counter!("booking_conflicts_total", "reason" => "unavailable").increment(1);
                Err(BookingError::Conflict(format!(
                    "slot {} is not available",
                    slot.id
                )))
            }
            ClaimOutcome::AlreadyBooked(slot) => {
                metrics::counter!("booking_conflicts_total", "reason" => "confirmed").increment(1);
                Err(BookingError::Conflict(format!(
                    "slot {} already has a confirmed booking",
                    slot.id
                )))
            }
        }
    }

    /// Returns a slot to AVAILABLE. Releasing an AVAILABLE slot is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn release(&self, slot_id: SlotId) -> Result<Slot> {
        self.store
            .release_slot(slot_id)
            .await?
            .ok_or(BookingError::SlotIdNotFound(slot_id))
    }

    /// Lists a resource's AVAILABLE slots for a date, ordered by start time.
    pub async fn list_available(&self, resource_id: ResourceId, date: NaiveDate) -> Result<Vec<Slot>> {
        Ok(self
            .store
            .list_slots(resource_id, date, Some(SlotStatus::Available))
            .await?)
    }

    /// Lists every slot on a date across resources.
    pub async fn list_by_date(&self, date: NaiveDate) -> Result<Vec<Slot>> {
        Ok(self.store.list_slots_by_date(date).await?)
    }

    /// Generates back-to-back slots between `open` and `close`, skipping keys
    /// that already exist. Returns the number of slots created.
    #[tracing::instrument(skip(self))]
    pub async fn generate(
        &self,
        resource_id: ResourceId,
        date: NaiveDate,
        open: NaiveTime,
        close: NaiveTime,
        slot_duration_minutes: u32,
    ) -> Result<usize> {
        let slots: Vec<Slot> = slot_windows(open, close, slot_duration_minutes)
            .into_iter()
            .map(|(start, end)| Slot::available(resource_id, date, start, end))
            .collect();

        if slots.is_empty() {
            return Ok(0);
        }

        let inserted = self.store.insert_slots(slots).await?;
        tracing::debug!(%resource_id, %date, inserted, "generated slots");
        Ok(inserted)
    }

    /// Deletes AVAILABLE slots dated before `before` that no booking ever
    /// referenced.
    #[tracing::instrument(skip(self))]
    pub async fn purge_stale(&self, before: NaiveDate) -> Result<u64> {
        Ok(self.store.delete_unreferenced_slots_before(before).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryReservationStore;
    use chrono::Utc;
    use common::UserId;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, 6).unwrap()
    }

    fn t(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    fn ledger() -> SlotLedger<InMemoryReservationStore> {
        SlotLedger::new(InMemoryReservationStore::new())
    }

    fn new_booking() -> NewBooking {
        NewBooking::for_user(UserId::new(), Utc::now())
    }

    #[tokio::test]
    async fn generate_is_idempotent() {
        let ledger = ledger();
        let resource = ResourceId::new();

        assert_eq!(ledger.generate(resource, date(), t(8), t(12), 60).await.unwrap(), 4);
        assert_eq!(ledger.generate(resource, date(), t(8), t(12), 60).await.unwrap(), 0);
        assert_eq!(ledger.list_available(resource, date()).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn generate_with_empty_hours_creates_nothing() {
        let ledger = ledger();
        let resource = ResourceId::new();
        assert_eq!(ledger.generate(resource, date(), t(12), t(8), 60).await.unwrap(), 0);
        assert_eq!(ledger.generate(resource, date(), t(8), t(12), 0).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn claim_unknown_slot_is_not_found() {
        let err = ledger()
            .claim(ResourceId::new(), date(), t(9), new_booking())
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::SlotNotFound { .. }));
    }

    #[tokio::test]
    async fn claimed_slot_conflicts_and_leaves_listing() {
        let ledger = ledger();
        let resource = ResourceId::new();
        ledger.generate(resource, date(), t(9), t(11), 60).await.unwrap();

        let (slot, booking) = ledger.claim(resource, date(), t(9), new_booking()).await.unwrap();
        assert_eq!(slot.status, SlotStatus::Booked);
        assert_eq!(booking.slot_id, slot.id);

        let err = ledger
            .claim(resource, date(), t(9), new_booking())
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Conflict(_)));

        let available = ledger.list_available(resource, date()).await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].start_time, t(10));
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let ledger = ledger();
        let resource = ResourceId::new();
        ledger.generate(resource, date(), t(9), t(10), 60).await.unwrap();
        let (slot, _) = ledger.claim(resource, date(), t(9), new_booking()).await.unwrap();

        let once = ledger.release(slot.id).await.unwrap();
        let twice = ledger.release(slot.id).await.unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice.status, SlotStatus::Available);
    }

    #[tokio::test]
    async fn release_unknown_slot_is_not_found() {
        let err = ledger().release(SlotId::new()).await.unwrap_err();
        assert!(matches!(err, BookingError::SlotIdNotFound(_)));
    }

    #[tokio::test]
    async fn list_by_date_spans_resources() {
        let ledger = ledger();
        ledger.generate(ResourceId::new(), date(), t(9), t(11), 60).await.unwrap();
        ledger.generate(ResourceId::new(), date(), t(9), t(10), 60).await.unwrap();
        assert_eq!(ledger.list_by_date(date()).await.unwrap().len(), 3);
    }
}
