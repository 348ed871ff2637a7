//! Reservation error types.

use chrono::{NaiveDate, NaiveTime};
use common::{BookingId, BookingStatus, ResourceId, SlotId, UnknownStatus};
use thiserror::Error;

/// Errors raised by a [`crate::ReservationStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row holds a value the domain does not recognise.
    #[error("Corrupt row: {0}")]
    Corrupt(#[from] UnknownStatus),

    /// A booking references a slot that no longer exists.
    #[error("Slot {0} referenced by a booking does not exist")]
    MissingSlot(SlotId),
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during reservation operations.
#[derive(Debug, Error)]
pub enum BookingError {
    /// The request is malformed or not allowed (e.g. a past date).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No slot exists at the requested coordinates.
    #[error("Slot not found: resource {resource_id} on {date} at {start_time}")]
    SlotNotFound {
        resource_id: ResourceId,
        date: NaiveDate,
        start_time: NaiveTime,
    },

    /// No slot exists with the given id.
    #[error("Slot not found: {0}")]
    SlotIdNotFound(SlotId),

    /// No booking exists with the given id.
    #[error("Booking not found: {0}")]
    BookingNotFound(BookingId),

    /// The slot is already held by another booking.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The booking has already been cancelled.
    #[error("Booking {0} is already cancelled")]
    AlreadyCancelled(BookingId),

    /// The booking is not in a state that allows the requested action.
    #[error("Invalid state transition: cannot {action} booking {booking_id} from {current} state")]
    InvalidTransition {
        booking_id: BookingId,
        current: BookingStatus,
        action: &'static str,
    },

    /// The backing store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for reservation operations.
pub type Result<T> = std::result::Result<T, BookingError>;
