//! Booking model and its state machine rules.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use common::{BookingEventPayload, BookingId, BookingStatus, ResourceId, SlotId, UserId};
use serde::{Deserialize, Serialize};

use crate::slot::Slot;

/// A user's claim on a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub slot_id: SlotId,
    pub resource_id: ResourceId,
    pub user_id: UserId,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

/// The data needed to insert a booking while claiming a slot.
#[derive(Debug, Clone, Copy)]
pub struct NewBooking {
    pub id: BookingId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl NewBooking {
    pub fn for_user(user_id: UserId, created_at: DateTime<Utc>) -> Self {
        Self {
            id: BookingId::new(),
            user_id,
            created_at,
        }
    }

    /// Materializes the booking row for `slot`, always PENDING_PAYMENT.
    pub fn into_booking(self, slot: &Slot) -> Booking {
        Booking {
            id: self.id,
            slot_id: slot.id,
            resource_id: slot.resource_id,
            user_id: self.user_id,
            status: BookingStatus::PendingPayment,
            created_at: self.created_at,
        }
    }
}

/// A booking joined with the time window of its slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    pub id: BookingId,
    pub slot_id: SlotId,
    pub resource_id: ResourceId,
    pub user_id: UserId,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl BookingView {
    pub fn new(booking: &Booking, slot: &Slot) -> Self {
        Self {
            id: booking.id,
            slot_id: booking.slot_id,
            resource_id: booking.resource_id,
            user_id: booking.user_id,
            date: slot.date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            status: booking.status,
            created_at: booking.created_at,
        }
    }

    /// Builds the `booking.created` / `booking.cancelled` payload.
    pub fn to_event(&self) -> BookingEventPayload {
        BookingEventPayload {
            booking_id: self.id,
            slot_id: self.slot_id,
            resource_id: self.resource_id,
            user_id: self.user_id,
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
            status: self.status,
        }
    }
}

/// A guarded booking transition, applied atomically by the store.
///
/// The store locks the booking, checks that its status is one of `from`,
/// writes `to` and, when the target no longer holds a slot, returns the slot to
/// AVAILABLE in the same unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub action: &'static str,
    pub from: &'static [BookingStatus],
    pub to: BookingStatus,
}

impl TransitionRule {
    pub const CANCEL: Self = Self {
        action: "cancel",
        from: &[BookingStatus::PendingPayment, BookingStatus::Confirmed],
        to: BookingStatus::Cancelled,
    };

    pub const CONFIRM: Self = Self {
        action: "confirm",
        from: &[BookingStatus::PendingPayment],
        to: BookingStatus::Confirmed,
    };

    pub const FAIL_PAYMENT: Self = Self {
        action: "fail payment for",
        from: &[BookingStatus::PendingPayment],
        to: BookingStatus::PaymentFailed,
    };

    pub const EXPIRE: Self = Self {
        action: "expire",
        from: &[BookingStatus::PendingPayment],
        to: BookingStatus::Cancelled,
    };

    /// Returns true if a booking in `status` may take this transition.
    pub fn permits(&self, status: BookingStatus) -> bool {
        self.from.contains(&status)
    }

    /// Returns true if applying this transition frees the booking's slot.
    pub fn releases_slot(&self) -> bool {
        !self.to.holds_slot()
    }
}

/// The outcome of a payment as reported by the payment service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOutcome {
    Confirmed,
    Failed,
    Expired,
}

impl PaymentOutcome {
    pub fn rule(&self) -> TransitionRule {
        match self {
            PaymentOutcome::Confirmed => TransitionRule::CONFIRM,
            PaymentOutcome::Failed => TransitionRule::FAIL_PAYMENT,
            PaymentOutcome::Expired => TransitionRule::EXPIRE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentOutcome::Confirmed => "CONFIRMED",
            PaymentOutcome::Failed => "FAILED",
            PaymentOutcome::Expired => "EXPIRED",
        }
    }
}

impl std::fmt::Display for PaymentOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
