use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{BookingId, BookingStatus, ResourceId, SlotId, SlotStatus, UserId};
use tokio::sync::RwLock;

use super::{ClaimOutcome, ReservationStore, TransitionOutcome};
use crate::booking::{Booking, NewBooking, TransitionRule};
use crate::error::{StoreError, StoreResult};
use crate::slot::{Slot, SlotKey};

#[derive(Default)]
struct State {
    slots: HashMap<SlotId, Slot>,
    slot_keys: HashMap<SlotKey, SlotId>,
    bookings: HashMap<BookingId, Booking>,
}

impl State {
    fn slot_is_referenced(&self, slot_id: SlotId) -> bool {
        self.bookings.values().any(|b| b.slot_id == slot_id)
    }
}

/// In-memory reservation store.
///
/// A single write lock guards all state, so every claim and transition is
/// serialized exactly as row locks would serialize them in PostgreSQL.
#[derive(Clone, Default)]
pub struct InMemoryReservationStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryReservationStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of slots stored.
    pub async fn slot_count(&self) -> usize {
        self.state.read().await.slots.len()
    }

    /// Returns the total number of bookings stored.
    pub async fn booking_count(&self) -> usize {
        self.state.read().await.bookings.len()
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn insert_slots(&self, slots: Vec<Slot>) -> StoreResult<usize> {
        let mut state = self.state.write().await;
        let mut inserted = 0;
        for slot in slots {
            let key = slot.key();
            if state.slot_keys.contains_key(&key) {
                continue;
            }
            state.slot_keys.insert(key, slot.id);
            state.slots.insert(slot.id, slot);
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn get_slot(&self, slot_id: SlotId) -> StoreResult<Option<Slot>> {
        Ok(self.state.read().await.slots.get(&slot_id).cloned())
    }

    async fn find_slot(&self, key: &SlotKey) -> StoreResult<Option<Slot>> {
        let state = self.state.read().await;
        Ok(state
            .slot_keys
            .get(key)
            .and_then(|id| state.slots.get(id))
            .cloned())
    }

    async fn list_slots(
        &self,
        resource_id: ResourceId,
        date: NaiveDate,
        status: Option<SlotStatus>,
    ) -> StoreResult<Vec<Slot>> {
        let state = self.state.read().await;
        let mut slots: Vec<_> = state
            .slots
            .values()
            .filter(|s| s.resource_id == resource_id && s.date == date)
            .filter(|s| status.is_none_or(|wanted| s.status == wanted))
            .cloned()
            .collect();
        slots.sort_by_key(|s| s.start_time);
        Ok(slots)
    }

    async fn list_slots_by_date(&self, date: NaiveDate) -> StoreResult<Vec<Slot>> {
        let state = self.state.read().await;
        let mut slots: Vec<_> = state
            .slots
            .values()
            .filter(|s| s.date == date)
            .cloned()
            .collect();
        slots.sort_by_key(|s| (s.resource_id, s.start_time));
        Ok(slots)
    }

    async fn claim_slot(&self, key: &SlotKey, booking: NewBooking) -> StoreResult<ClaimOutcome> {
        let mut state = self.state.write().await;

        let Some(slot_id) = state.slot_keys.get(key).copied() else {
            return Ok(ClaimOutcome::SlotMissing);
        };
        let Some(slot) = state.slots.get(&slot_id).cloned() else {
            return Ok(ClaimOutcome::SlotMissing);
        };

        if !slot.is_available() {
            return Ok(ClaimOutcome::SlotUnavailable(slot));
        }

        let confirmed_exists = state
            .bookings
            .values()
            .any(|b| b.slot_id == slot_id && b.status == BookingStatus::Confirmed);
        if confirmed_exists {
            return Ok(ClaimOutcome::AlreadyBooked(slot));
        }

        let booking = booking.into_booking(&slot);
        let mut slot = slot;
        slot.status = SlotStatus::Booked;

        state.slots.insert(slot_id, slot.clone());
        state.bookings.insert(booking.id, booking.clone());

        Ok(ClaimOutcome::Claimed { slot, booking })
    }

    async fn release_slot(&self, slot_id: SlotId) -> StoreResult<Option<Slot>> {
        let mut state = self.state.write().await;
        Ok(state.slots.get_mut(&slot_id).map(|slot| {
            slot.status = SlotStatus::Available;
            slot.clone()
        }))
    }

    async fn delete_unreferenced_slots_before(&self, date: NaiveDate) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        let stale: Vec<Slot> = state
            .slots
            .values()
            .filter(|s| s.date < date && s.is_available())
            .filter(|s| !state.slot_is_referenced(s.id))
            .cloned()
            .collect();

        for slot in &stale {
            state.slots.remove(&slot.id);
            state.slot_keys.remove(&slot.key());
        }
        Ok(stale.len() as u64)
    }

    async fn get_booking(&self, booking_id: BookingId) -> StoreResult<Option<Booking>> {
        Ok(self.state.read().await.bookings.get(&booking_id).cloned())
    }

    async fn list_bookings_by_user(&self, user_id: UserId) -> StoreResult<Vec<Booking>> {
        let state = self.state.read().await;
        let mut bookings: Vec<_> = state
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn transition_booking(
        &self,
        booking_id: BookingId,
        rule: TransitionRule,
    ) -> StoreResult<TransitionOutcome> {
        let mut state = self.state.write().await;

        let Some(booking) = state.bookings.get(&booking_id).cloned() else {
            return Ok(TransitionOutcome::NotFound);
        };
        if !rule.permits(booking.status) {
            return Ok(TransitionOutcome::Rejected { booking });
        }

        let slot = state
            .slots
            .get_mut(&booking.slot_id)
            .ok_or(StoreError::MissingSlot(booking.slot_id))?;
        if rule.releases_slot() {
            slot.status = SlotStatus::Available;
        }
        let slot = slot.clone();

        let mut booking = booking;
        booking.status = rule.to;
        state.bookings.insert(booking_id, booking.clone());

        Ok(TransitionOutcome::Applied { booking, slot })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Utc};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, d).unwrap()
    }

    fn time(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    async fn seeded(resource_id: ResourceId, day: u32) -> (InMemoryReservationStore, Slot) {
        let store = InMemoryReservationStore::new();
        let slot = Slot::available(resource_id, date(day), time(9), time(10));
        store.insert_slots(vec![slot.clone()]).await.unwrap();
        (store, slot)
    }

    #[tokio::test]
    async fn insert_skips_existing_keys() {
        let resource_id = ResourceId::new();
        let (store, slot) = seeded(resource_id, 1).await;

        let duplicate = Slot::available(resource_id, slot.date, slot.start_time, slot.end_time);
        let other = Slot::available(resource_id, slot.date, time(10), time(11));
        let inserted = store.insert_slots(vec![duplicate, other]).await.unwrap();

        assert_eq!(inserted, 1);
        assert_eq!(store.slot_count().await, 2);
        assert_eq!(store.find_slot(&slot.key()).await.unwrap().unwrap().id, slot.id);
    }

    #[tokio::test]
    async fn claim_marks_slot_booked_and_inserts_booking() {
        let (store, slot) = seeded(ResourceId::new(), 1).await;
        let new = NewBooking::for_user(UserId::new(), Utc::now());

        let outcome = store.claim_slot(&slot.key(), new).await.unwrap();
        let ClaimOutcome::Claimed { slot: claimed, booking } = outcome else {
            panic!("expected claim, got {outcome:?}");
        };

        assert_eq!(claimed.status, SlotStatus::Booked);
        assert_eq!(booking.id, new.id);
        assert_eq!(booking.status, BookingStatus::PendingPayment);
        assert_eq!(store.booking_count().await, 1);
    }

    #[tokio::test]
    async fn second_claim_sees_unavailable_slot() {
        let (store, slot) = seeded(ResourceId::new(), 1).await;
        store
            .claim_slot(&slot.key(), NewBooking::for_user(UserId::new(), Utc::now()))
            .await
            .unwrap();

        let outcome = store
            .claim_slot(&slot.key(), NewBooking::for_user(UserId::new(), Utc::now()))
            .await
            .unwrap();
        assert!(matches!(outcome, ClaimOutcome::SlotUnavailable(_)));
        assert_eq!(store.booking_count().await, 1);
    }

    #[tokio::test]
    async fn claim_rejects_slot_with_confirmed_booking() {
        let (store, slot) = seeded(ResourceId::new(), 1).await;
        let ClaimOutcome::Claimed { booking, .. } = store
            .claim_slot(&slot.key(), NewBooking::for_user(UserId::new(), Utc::now()))
            .await
            .unwrap()
        else {
            panic!("expected claim");
        };
        store
            .transition_booking(booking.id, TransitionRule::CONFIRM)
            .await
            .unwrap();
        // Drift: the slot row says AVAILABLE while a confirmed booking holds it.
        store.release_slot(slot.id).await.unwrap();

        let outcome = store
            .claim_slot(&slot.key(), NewBooking::for_user(UserId::new(), Utc::now()))
            .await
            .unwrap();
        assert!(matches!(outcome, ClaimOutcome::AlreadyBooked(_)));
    }

    #[tokio::test]
    async fn claim_of_unknown_key_reports_missing() {
        let store = InMemoryReservationStore::new();
        let key = SlotKey::new(ResourceId::new(), date(1), time(9));
        let outcome = store
            .claim_slot(&key, NewBooking::for_user(UserId::new(), Utc::now()))
            .await
            .unwrap();
        assert_eq!(outcome, ClaimOutcome::SlotMissing);
    }

    #[tokio::test]
    async fn rejected_transition_leaves_state_unchanged() {
        let (store, slot) = seeded(ResourceId::new(), 1).await;
        let ClaimOutcome::Claimed { booking, .. } = store
            .claim_slot(&slot.key(), NewBooking::for_user(UserId::new(), Utc::now()))
            .await
            .unwrap()
        else {
            panic!("expected claim");
        };
        store
            .transition_booking(booking.id, TransitionRule::CANCEL)
            .await
            .unwrap();

        let outcome = store
            .transition_booking(booking.id, TransitionRule::CONFIRM)
            .await
            .unwrap();
        let TransitionOutcome::Rejected { booking: current } = outcome else {
            panic!("expected rejection");
        };
        assert_eq!(current.status, BookingStatus::Cancelled);
        assert_eq!(
            store.get_slot(slot.id).await.unwrap().unwrap().status,
            SlotStatus::Available
        );
    }

    #[tokio::test]
    async fn transition_of_unknown_booking_reports_not_found() {
        let store = InMemoryReservationStore::new();
        let outcome = store
            .transition_booking(BookingId::new(), TransitionRule::CANCEL)
            .await
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::NotFound);
    }

    #[tokio::test]
    async fn purge_keeps_referenced_booked_and_current_slots() {
        let resource_id = ResourceId::new();
        let store = InMemoryReservationStore::new();
        let stale = Slot::available(resource_id, date(1), time(8), time(9));
        let referenced = Slot::available(resource_id, date(1), time(9), time(10));
        let booked = Slot::available(resource_id, date(1), time(10), time(11));
        let today = Slot::available(resource_id, date(2), time(9), time(10));
        store
            .insert_slots(vec![stale.clone(), referenced.clone(), booked.clone(), today.clone()])
            .await
            .unwrap();

        // A cancelled booking still counts as a reference.
        let ClaimOutcome::Claimed { booking, .. } = store
            .claim_slot(&referenced.key(), NewBooking::for_user(UserId::new(), Utc::now()))
            .await
            .unwrap()
        else {
            panic!("expected claim");
        };
        store
            .transition_booking(booking.id, TransitionRule::CANCEL)
            .await
            .unwrap();
        store
            .claim_slot(&booked.key(), NewBooking::for_user(UserId::new(), Utc::now()))
            .await
            .unwrap();

        let deleted = store.delete_unreferenced_slots_before(date(2)).await.unwrap();

        assert_eq!(deleted, 1);
        assert!(store.get_slot(stale.id).await.unwrap().is_none());
        assert!(store.find_slot(&stale.key()).await.unwrap().is_none());
        assert!(store.get_slot(referenced.id).await.unwrap().is_some());
        assert!(store.get_slot(booked.id).await.unwrap().is_some());
        assert!(store.get_slot(today.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn listings_are_ordered() {
        let a = ResourceId::new();
        let store = InMemoryReservationStore::new();
        store
            .insert_slots(vec![
                Slot::available(a, date(1), time(11), time(12)),
                Slot::available(a, date(1), time(9), time(10)),
                Slot::available(a, date(1), time(10), time(11)),
            ])
            .await
            .unwrap();

        let slots = store.list_slots(a, date(1), None).await.unwrap();
        let starts: Vec<_> = slots.iter().map(|s| s.start_time).collect();
        assert_eq!(starts, vec![time(9), time(10), time(11)]);

        let none_booked = store
            .list_slots(a, date(1), Some(SlotStatus::Booked))
            .await
            .unwrap();
        assert!(none_booked.is_empty());
        assert_eq!(store.list_slots_by_date(date(1)).await.unwrap().len(), 3);
    }
}
