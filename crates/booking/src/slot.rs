//! Slot inventory model.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use common::{ResourceId, SlotId, SlotStatus};
use serde::{Deserialize, Serialize};

/// The natural key of a slot: at most one slot exists per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub resource_id: ResourceId,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
}

impl SlotKey {
    pub fn new(resource_id: ResourceId, date: NaiveDate, start_time: NaiveTime) -> Self {
        Self {
            resource_id,
            date,
            start_time,
        }
    }
}

/// A reservable fixed time interval for one resource on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    pub resource_id: ResourceId,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: SlotStatus,
    pub created_at: DateTime<Utc>,
}

impl Slot {
    /// Creates a new AVAILABLE slot.
    pub fn available(
        resource_id: ResourceId,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        Self {
            id: SlotId::new(),
            resource_id,
            date,
            start_time,
            end_time,
            status: SlotStatus::Available,
            created_at: Utc::now(),
        }
    }

    pub fn key(&self) -> SlotKey {
        SlotKey::new(self.resource_id, self.date, self.start_time)
    }

    pub fn is_available(&self) -> bool {
        self.status == SlotStatus::Available
    }
}

/// Read projection of a slot returned by availability queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySlot {
    pub slot_id: SlotId,
    pub resource_id: ResourceId,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: SlotStatus,
}

impl From<&Slot> for AvailabilitySlot {
    fn from(slot: &Slot) -> Self {
        Self {
            slot_id: slot.id,
            resource_id: slot.resource_id,
            date: slot.date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            status: slot.status,
        }
    }
}

/// Splits `open..close` into back-to-back windows of `duration_minutes`.
///
/// A trailing window that would end after `close` is dropped. Returns no
/// windows when the duration is zero or `open >= close`.
pub fn slot_windows(
    open: NaiveTime,
    close: NaiveTime,
    duration_minutes: u32,
) -> Vec<(NaiveTime, NaiveTime)> {
    if duration_minutes == 0 || open >= close {
        return Vec::new();
    }

    let step = TimeDelta::minutes(i64::from(duration_minutes));
    let mut windows = Vec::new();
    let mut current = open;

    while current < close {
        let (end, wrapped_secs) = current.overflowing_add_signed(step);
        if wrapped_secs != 0 || end > close {
            break;
        }
        windows.push((current, end));
        current = end;
    }

    windows
}
