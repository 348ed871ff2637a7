//! Event bus contract shared between the reservation, payment and
//! availability services.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::{BookingId, BookingStatus, PaymentId, PaymentStatus, ResourceId, SlotId, UserId};

/// Topic names.
pub mod topics {
    pub const BOOKING_CREATED: &str = "booking.created";
    pub const BOOKING_CANCELLED: &str = "booking.cancelled";
    pub const PAYMENT_CONFIRMED: &str = "payment.confirmed";
    pub const PAYMENT_FAILED: &str = "payment.failed";
    pub const PAYMENT_EXPIRED: &str = "payment.expired";
    pub const SCHEDULE_UPDATED: &str = "schedule.updated";

    /// Topics carrying a payment outcome.
    pub const PAYMENT_OUTCOMES: [&str; 3] = [PAYMENT_CONFIRMED, PAYMENT_FAILED, PAYMENT_EXPIRED];

    /// Topics carrying booking lifecycle facts.
    pub const BOOKING_LIFECYCLE: [&str; 2] = [BOOKING_CREATED, BOOKING_CANCELLED];
}

/// Payload of `booking.created` and `booking.cancelled`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingEventPayload {
    pub booking_id: BookingId,
    pub slot_id: SlotId,
    pub resource_id: ResourceId,
    pub user_id: UserId,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: BookingStatus,
}

/// Payload of `payment.confirmed`, `payment.failed` and `payment.expired`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEventPayload {
    pub payment_id: PaymentId,
    pub booking_id: BookingId,
    pub user_id: UserId,
    /// Amount in minor currency units.
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
}

/// Payload of `schedule.updated`, published by the catalog when a resource's
/// weekly opening hours change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleUpdatedPayload {
    pub resource_id: ResourceId,
    /// ISO weekday, 1 = Monday through 7 = Sunday.
    pub day_of_week: u32,
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
}
