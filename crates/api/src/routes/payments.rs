//! Payment endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use booking::ReservationStore;
use common::{BookingId, BookingStatus};
use payment::{CheckoutSession, Payment, PaymentError, PaymentStore};
use serde::Deserialize;

use super::{parse_id, user_id};
use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub booking_id: String,
}

/// GET /payments/me: the caller's payments, newest first.
#[tracing::instrument(skip(state, headers))]
pub async fn mine<B, P>(
    State(state): State<Arc<AppState<B, P>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Payment>>, ApiError>
where
    B: ReservationStore + 'static,
    P: PaymentStore + 'static,
{
    let user = user_id(&headers)?;
    Ok(Json(state.payments.list_by_user(user).await?))
}

/// GET /payments/booking/{bookingId}
#[tracing::instrument(skip(state))]
pub async fn for_booking<B, P>(
    State(state): State<Arc<AppState<B, P>>>,
    Path(id): Path<String>,
) -> Result<Json<Payment>, ApiError>
where
    B: ReservationStore + 'static,
    P: PaymentStore + 'static,
{
    let booking_id: BookingId = parse_id(&id, "booking id")?;
    Ok(Json(state.payments.get_by_booking(booking_id).await?))
}

/// POST /payments/checkout: returns the checkout redirect for one of the
/// caller's pending bookings.
///
/// Answers 200 with the existing session when the saga already opened one,
/// and 201 when this call opened it.
#[tracing::instrument(skip(state, headers, req))]
pub async fn checkout<B, P>(
    State(state): State<Arc<AppState<B, P>>>,
    headers: HeaderMap,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutSession>), ApiError>
where
    B: ReservationStore + 'static,
    P: PaymentStore + 'static,
{
    let user = user_id(&headers)?;
    let booking_id: BookingId = parse_id(&req.booking_id, "bookingId")?;

    let booking = state.reservations.get_by_id(booking_id).await?;
    if booking.user_id != user {
        return Err(ApiError::NotFound(format!("Booking not found: {booking_id}")));
    }
    if booking.status != BookingStatus::PendingPayment {
        return Err(ApiError::Conflict(format!(
            "booking {booking_id} is {} and needs no payment",
            booking.status
        )));
    }

    match state.payments.get_by_booking(booking_id).await {
        Ok(existing) if existing.status.is_pending() => {
            return Ok((StatusCode::OK, Json(CheckoutSession::from(&existing))));
        }
        Ok(existing) => {
            return Err(ApiError::Conflict(format!(
                "payment for booking {booking_id} is already {}",
                existing.status
            )));
        }
        Err(PaymentError::NotFoundForBooking(_)) => {}
        Err(err) => return Err(err.into()),
    }

    let session = state.payments.initiate_checkout(booking_id, user).await?;
    Ok((StatusCode::CREATED, Json(session)))
}
