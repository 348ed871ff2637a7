//! Shared types for the court reservation services.

pub mod contract;
pub mod status;
mod types;

pub use contract::{BookingEventPayload, PaymentEventPayload, ScheduleUpdatedPayload, topics};
pub use status::{BookingStatus, PaymentStatus, SlotStatus, UnknownStatus};
pub use types::{BookingId, PaymentId, ResourceId, SlotId, UserId};
