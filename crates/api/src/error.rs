//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use booking::BookingError;
use payment::{GatewayError, PaymentError};
use thiserror::Error;

/// Errors that stop the server from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to connect to database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to migrate reservation schema: {0}")]
    ReservationStore(#[from] booking::StoreError),

    #[error("invalid gateway configuration: {0}")]
    Gateway(#[from] GatewayError),

    #[error("invalid cache configuration: {0}")]
    Cache(#[from] availability::CacheError),

    #[error("invalid slot source configuration: {0}")]
    SlotSource(#[from] availability::SourceError),

    #[error("failed to subscribe consumers: {0}")]
    Bus(#[from] event_bus::EventBusError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// The request conflicts with current state.
    Conflict(String),
    /// Reservation error.
    Booking(BookingError),
    /// Payment error.
    Payment(PaymentError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Booking(err) => booking_error_to_response(err),
            ApiError::Payment(err) => payment_error_to_response(err),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn booking_error_to_response(err: BookingError) -> (StatusCode, String) {
    let status = match &err {
        BookingError::InvalidRequest(_)
        | BookingError::AlreadyCancelled(_)
        | BookingError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
        BookingError::SlotNotFound { .. }
        | BookingError::SlotIdNotFound(_)
        | BookingError::BookingNotFound(_) => StatusCode::NOT_FOUND,
        BookingError::Conflict(_) => StatusCode::CONFLICT,
        BookingError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

fn payment_error_to_response(err: PaymentError) -> (StatusCode, String) {
    let status = match &err {
        PaymentError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        PaymentError::NotFoundForBooking(_) | PaymentError::SessionNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        PaymentError::AlreadyExists(_) => StatusCode::CONFLICT,
        PaymentError::Gateway(GatewayError::MalformedCallback(_)) => StatusCode::BAD_REQUEST,
        PaymentError::Gateway(GatewayError::NotConfigured(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        PaymentError::Gateway(_) => StatusCode::BAD_GATEWAY,
        PaymentError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        ApiError::Booking(err)
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        ApiError::Payment(err)
    }
}
