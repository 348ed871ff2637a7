//! Persistence for slots and bookings.

mod memory;
mod postgres;

pub use memory::InMemoryReservationStore;
pub use postgres::PostgresReservationStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{BookingId, ResourceId, SlotId, SlotStatus, UserId};

use crate::booking::{Booking, NewBooking, TransitionRule};
use crate::error::StoreResult;
use crate::slot::{Slot, SlotKey};

/// Result of an atomic slot claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The slot was AVAILABLE and is now BOOKED by the new booking.
    Claimed { slot: Slot, booking: Booking },
    /// No slot exists for the key.
    SlotMissing,
    /// The slot is not AVAILABLE.
    SlotUnavailable(Slot),
    /// A CONFIRMED booking already references the slot.
    AlreadyBooked(Slot),
}

/// Result of a guarded booking transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The rule permitted the transition and it has been committed.
    Applied { booking: Booking, slot: Slot },
    /// The booking's current status does not permit the rule; nothing changed.
    Rejected { booking: Booking },
    /// No booking exists with the given id.
    NotFound,
}

/// Core trait for reservation persistence backends.
///
/// Every method is a single unit of work. `claim_slot` and
/// `transition_booking` must serialize against concurrent calls touching the
/// same slot or booking: two claims of one slot can never both succeed, and a
/// cancel racing a payment outcome can never both apply.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Inserts slots, skipping any whose `(resource, date, start)` key already
    /// exists. Returns the number of slots inserted.
    async fn insert_slots(&self, slots: Vec<Slot>) -> StoreResult<usize>;

    /// Loads a slot by id.
    async fn get_slot(&self, slot_id: SlotId) -> StoreResult<Option<Slot>>;

    /// Loads a slot by its natural key.
    async fn find_slot(&self, key: &SlotKey) -> StoreResult<Option<Slot>>;

    /// Lists a resource's slots for a date, ordered by start time, optionally
    /// filtered by status.
    async fn list_slots(
        &self,
        resource_id: ResourceId,
        date: NaiveDate,
        status: Option<SlotStatus>,
    ) -> StoreResult<Vec<Slot>>;

    /// Lists every slot on a date, ordered by resource then start time.
    async fn list_slots_by_date(&self, date: NaiveDate) -> StoreResult<Vec<Slot>>;

    /// Atomically checks the slot and the absence of a CONFIRMED booking, then
    /// marks the slot BOOKED and inserts the booking.
    async fn claim_slot(&self, key: &SlotKey, booking: NewBooking) -> StoreResult<ClaimOutcome>;

    /// Sets a slot AVAILABLE. Returns None if the slot does not exist.
    async fn release_slot(&self, slot_id: SlotId) -> StoreResult<Option<Slot>>;

    /// Deletes AVAILABLE slots dated strictly before `date` that no booking has
    /// ever referenced. Returns the number of slots deleted.
    async fn delete_unreferenced_slots_before(&self, date: NaiveDate) -> StoreResult<u64>;

    /// Loads a booking by id.
    async fn get_booking(&self, booking_id: BookingId) -> StoreResult<Option<Booking>>;

    /// Lists a user's bookings, newest first.
    async fn list_bookings_by_user(&self, user_id: UserId) -> StoreResult<Vec<Booking>>;

    /// Applies `rule` to a booking under an exclusive lock.
    async fn transition_booking(
        &self,
        booking_id: BookingId,
        rule: TransitionRule,
    ) -> StoreResult<TransitionOutcome>;
}
