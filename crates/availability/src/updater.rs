//! Keeps the cache in step with booking lifecycle events.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{BookingEventPayload, SlotStatus, topics};
use event_bus::{EventEnvelope, EventHandler, HandlerError};

use crate::cache::{AvailabilityCache, write_with_timeout};
use crate::key::CacheKey;

/// Default bound on a single cache write.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Marks a slot BOOKED on `booking.created` and AVAILABLE on
/// `booking.cancelled`.
pub struct BookingEventCacheUpdater {
    cache: Arc<dyn AvailabilityCache>,
    write_timeout: Duration,
}

impl BookingEventCacheUpdater {
    pub fn new(cache: Arc<dyn AvailabilityCache>) -> Self {
        Self {
            cache,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    fn status_for(topic: &str) -> Option<SlotStatus> {
        match topic {
            topics::BOOKING_CREATED => Some(SlotStatus::Booked),
            topics::BOOKING_CANCELLED => Some(SlotStatus::Available),
            _ => None,
        }
    }
}

#[async_trait]
impl EventHandler for BookingEventCacheUpdater {
    fn name(&self) -> &'static str {
        "availability.cache_updater"
    }

    fn topics(&self) -> &'static [&'static str] {
        &topics::BOOKING_LIFECYCLE
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<(), HandlerError> {
        let Some(status) = Self::status_for(&event.topic) else {
            return Ok(());
        };
        let booking: BookingEventPayload = event.decode()?;
        let key = CacheKey::for_slot(booking.resource_id, booking.date, booking.start_time);

        match write_with_timeout(self.cache.as_ref(), &key, status, self.write_timeout).await {
            Ok(()) => {
                metrics::counter!(
                    "availability_cache_writes_total",
                    "source" => "event",
                    "outcome" => "ok"
                )
                .increment(1);
                tracing::debug!(%key, %status, booking_id = %booking.booking_id, "cache entry updated");
                Ok(())
            }
            Err(err) => {
                metrics::counter!(
                    "availability_cache_writes_total",
                    "source" => "event",
                    "outcome" => "error"
                )
                .increment(1);
                // The next sweep rewrites the entry
                Err(HandlerError::failed(err))
            }
        }
    }
}
