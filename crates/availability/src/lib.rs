//! Low-latency availability view kept consistent with the slot ledger.
//!
//! This crate provides:
//! - [`AvailabilityCache`] with in-memory and REST adapters
//! - [`BookingEventCacheUpdater`], the bus handler applying booking events
//! - [`ReconciliationSweep`], which repairs drift from a [`SlotSource`]

pub mod cache;
pub mod error;
pub mod key;
pub mod source;
pub mod sweep;
pub mod updater;

pub use cache::{
    AvailabilityCache, CacheEntry, InMemoryAvailabilityCache, RestAvailabilityCache,
    RestCacheConfig, write_with_timeout,
};
pub use error::{CacheError, SourceError};
pub use key::CacheKey;
pub use source::{HttpSlotSource, SlotSnapshot, SlotSource};
pub use sweep::{MAX_WINDOW_DAYS, ReconciliationSweep, SweepOutcome, SweepReport, SweepSettings};
pub use updater::{BookingEventCacheUpdater, DEFAULT_WRITE_TIMEOUT};
