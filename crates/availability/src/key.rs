//! Cache key layout.

use chrono::{NaiveDate, NaiveTime};
use common::ResourceId;

/// Key of one slot's entry in the availability cache:
/// `availability/{resourceId}/{date}/{HH-MM}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Root segment shared by every key.
    pub const ROOT: &'static str = "availability";

    pub fn for_slot(resource_id: ResourceId, date: NaiveDate, start_time: NaiveTime) -> Self {
        Self(format!(
            "{}/{}/{}/{}",
            Self::ROOT,
            resource_id,
            date.format("%Y-%m-%d"),
            start_time.format("%H-%M"),
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
