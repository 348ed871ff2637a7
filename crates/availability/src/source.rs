//! Authoritative slot listings consumed by the reconciliation sweep.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use common::{ResourceId, SlotId, SlotStatus};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::key::CacheKey;

/// A slot as reported by the reservation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotSnapshot {
    pub slot_id: SlotId,
    pub resource_id: ResourceId,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: SlotStatus,
}

impl SlotSnapshot {
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::for_slot(self.resource_id, self.date, self.start_time)
    }
}

/// Source of truth for slot status.
#[async_trait]
pub trait SlotSource: Send + Sync {
    /// Lists every slot on `date`, across all resources.
    async fn slots_on(&self, date: NaiveDate) -> Result<Vec<SlotSnapshot>, SourceError>;
}

/// Reads slots from the reservation service's internal listing endpoint.
#[derive(Debug, Clone)]
pub struct HttpSlotSource {
    client: Client,
    base_url: String,
}

impl HttpSlotSource {
    /// Path of the listing endpoint, relative to the service root.
    pub const PATH: &'static str = "/internal/slots";

    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SlotSource for HttpSlotSource {
    #[tracing::instrument(skip(self))]
    async fn slots_on(&self, date: NaiveDate) -> Result<Vec<SlotSnapshot>, SourceError> {
        let slots = self
            .client
            .get(format!("{}{}", self.base_url, Self::PATH))
            .query(&[("date", date.format("%Y-%m-%d").to_string())])
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<SlotSnapshot>>()
            .await?;
        Ok(slots)
    }
}
