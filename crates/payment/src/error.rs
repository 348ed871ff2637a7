//! Payment error types.

use std::time::Duration;

use common::{BookingId, UnknownStatus};
use thiserror::Error;

/// Errors raised by a [`crate::PaymentStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row holds a value the domain does not recognise.
    #[error("Corrupt row: {0}")]
    Corrupt(#[from] UnknownStatus),
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors raised by a [`crate::CheckoutGateway`] adapter.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway could not be reached or answered with an error status.
    #[error("Gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway did not answer within the configured bound.
    #[error("Gateway timed out after {0:?}")]
    Timeout(Duration),

    /// The gateway refused to open a session.
    #[error("Gateway declined the session: {0}")]
    Declined(String),

    /// The adapter is missing required configuration.
    #[error("Gateway not configured: {0}")]
    NotConfigured(String),

    /// A callback body could not be decoded.
    #[error("Malformed gateway callback: {0}")]
    MalformedCallback(#[from] serde_json::Error),
}

/// Errors that can occur during payment operations.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// A payment already exists for the booking.
    #[error("Payment already exists for booking {0}")]
    AlreadyExists(BookingId),

    /// No payment exists for the booking.
    #[error("Payment not found for booking {0}")]
    NotFoundForBooking(BookingId),

    /// No payment references the gateway session.
    #[error("Payment not found for session {0}")]
    SessionNotFound(String),

    /// The request is malformed or not allowed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The checkout gateway failed.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The backing store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience type alias for payment results.
pub type Result<T> = std::result::Result<T, PaymentError>;
