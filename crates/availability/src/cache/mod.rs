//! Downstream availability cache.
//!
//! The cache is a low-latency read view that clients subscribe to. It is
//! derived state: booking events keep it fresh and the reconciliation sweep
//! repairs whatever those events missed.

mod memory;
mod rest;

pub use memory::InMemoryAvailabilityCache;
pub use rest::{RestAvailabilityCache, RestCacheConfig};

use std::time::Duration;

use async_trait::async_trait;
use common::SlotStatus;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::key::CacheKey;

/// One slot's entry as stored in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub status: SlotStatus,
    /// Milliseconds since the epoch, stamped by the cache on write.
    pub updated_at: i64,
}

/// Write access to the availability view.
///
/// Writes overwrite the whole entry; the last write wins.
#[async_trait]
pub trait AvailabilityCache: Send + Sync {
    /// Sets the status stored under `key`.
    async fn write_status(&self, key: &CacheKey, status: SlotStatus) -> Result<(), CacheError>;

    /// Reads the entry under `key`.
    async fn read(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError>;
}

/// Writes `status` under `key`, giving up after `timeout`.
pub async fn write_with_timeout(
    cache: &dyn AvailabilityCache,
    key: &CacheKey,
    status: SlotStatus,
    timeout: Duration,
) -> Result<(), CacheError> {
    match tokio::time::timeout(timeout, cache.write_status(key, status)).await {
        Ok(result) => result,
        Err(_) => Err(CacheError::Timeout(timeout)),
    }
}
