use std::time::Duration;

use async_trait::async_trait;
use common::SlotStatus;
use reqwest::Client;
use serde_json::json;

use super::{AvailabilityCache, CacheEntry};
use crate::error::CacheError;
use crate::key::CacheKey;

/// REST cache configuration.
#[derive(Debug, Clone)]
pub struct RestCacheConfig {
    /// Database root, e.g. `https://example-project.firebaseio.com`.
    pub base_url: String,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for RestCacheConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Availability cache behind a realtime-database REST API.
///
/// Each entry lives at `{base_url}/{key}.json`. Writes PATCH the status and
/// let the server stamp `updatedAt`.
#[derive(Debug, Clone)]
pub struct RestAvailabilityCache {
    client: Client,
    base_url: String,
}

impl RestAvailabilityCache {
    pub fn new(config: RestCacheConfig) -> Result<Self, CacheError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(CacheError::NotConfigured("cache base URL is empty".to_string()));
        }

        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn entry_url(&self, key: &CacheKey) -> String {
        format!("{}/{}.json", self.base_url, key)
    }
}

#[async_trait]
impl AvailabilityCache for RestAvailabilityCache {
    #[tracing::instrument(skip(self), fields(key = %key))]
    async fn write_status(&self, key: &CacheKey, status: SlotStatus) -> Result<(), CacheError> {
        let body = json!({
            "status": status,
            "updatedAt": { ".sv": "timestamp" },
        });

        self.client
            .patch(self.entry_url(key))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn read(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        // A missing entry comes back as a JSON `null`
        let entry = self
            .client
            .get(self.entry_url(key))
            .send()
            .await?
            .error_for_status()?
            .json::<Option<CacheEntry>>()
            .await?;
        Ok(entry)
    }
}
