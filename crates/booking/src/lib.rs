//! Reservation side of the court booking system.
//!
//! This crate provides:
//! - The slot ledger, the only writer of slot state
//! - The reservation state machine and its service API
//! - In-memory and PostgreSQL reservation stores
//! - Bus handlers for payment outcomes and schedule updates

pub mod booking;
pub mod clock;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod service;
pub mod slot;
pub mod store;

pub use booking::{Booking, BookingView, NewBooking, PaymentOutcome, TransitionRule};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{BookingError, Result, StoreError, StoreResult};
pub use handlers::{PaymentOutcomeHandler, ScheduleHandler, ScheduleSettings};
pub use ledger::SlotLedger;
pub use service::{OutcomeApplication, ReservationService};
pub use slot::{AvailabilitySlot, Slot, SlotKey, slot_windows};
pub use store::{
    ClaimOutcome, InMemoryReservationStore, PostgresReservationStore, ReservationStore,
    TransitionOutcome,
};
