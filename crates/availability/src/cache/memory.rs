use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use common::SlotStatus;
use tokio::sync::RwLock;

use super::{AvailabilityCache, CacheEntry};
use crate::error::CacheError;
use crate::key::CacheKey;

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    writes: u64,
    delay: Option<Duration>,
    fail_writes: bool,
}

/// In-memory availability cache.
///
/// Besides storing entries it can be told to stall or fail writes, which
/// the sweep and updater tests use to simulate a degraded cache.
#[derive(Clone, Default)]
pub struct InMemoryAvailabilityCache {
    state: Arc<RwLock<CacheState>>,
}

impl InMemoryAvailabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every entry.
    pub async fn entries(&self) -> HashMap<CacheKey, CacheEntry> {
        self.state.read().await.entries.clone()
    }

    /// Returns the number of successful writes so far.
    pub async fn write_count(&self) -> u64 {
        self.state.read().await.writes
    }

    /// Delays every subsequent write by `delay`.
    pub async fn set_delay(&self, delay: Option<Duration>) {
        self.state.write().await.delay = delay;
    }

    /// Makes every subsequent write fail.
    pub async fn set_fail_writes(&self, fail: bool) {
        self.state.write().await.fail_writes = fail;
    }
}

#[async_trait]
impl AvailabilityCache for InMemoryAvailabilityCache {
    async fn write_status(&self, key: &CacheKey, status: SlotStatus) -> Result<(), CacheError> {
        let (delay, fail) = {
            let state = self.state.read().await;
            (state.delay, state.fail_writes)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(CacheError::Unavailable("writes disabled".to_string()));
        }

        let mut state = self.state.write().await;
        state.entries.insert(
            key.clone(),
            CacheEntry {
                status,
                updated_at: Utc::now().timestamp_millis(),
            },
        );
        state.writes += 1;
        Ok(())
    }

    async fn read(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.state.read().await.entries.get(key).copied())
    }
}
