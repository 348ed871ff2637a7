//! Availability error types.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by an [`crate::AvailabilityCache`] adapter.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache endpoint could not be reached or rejected the write.
    #[error("Cache HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The write did not complete within its bound.
    #[error("Cache write timed out after {0:?}")]
    Timeout(Duration),

    /// The adapter is missing required configuration.
    #[error("Cache not configured: {0}")]
    NotConfigured(String),

    /// The cache refused the operation.
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by a [`crate::SlotSource`].
#[derive(Debug, Error)]
pub enum SourceError {
    /// The reservation service could not be reached or answered with an error.
    #[error("Slot source HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The source failed for a reason of its own.
    #[error("Slot source unavailable: {0}")]
    Unavailable(String),
}
