//! Booking endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use booking::{AvailabilitySlot, BookingView, ReservationStore};
use common::{BookingId, ResourceId};
use payment::PaymentStore;
use serde::Deserialize;

use super::{parse_date, parse_id, parse_time, user_id};
use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub resource_id: String,
    pub date: String,
    pub start_time: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub resource_id: String,
    pub date: String,
}

/// POST /bookings: book a slot for the calling user.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<B, P>(
    State(state): State<Arc<AppState<B, P>>>,
    headers: HeaderMap,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingView>), ApiError>
where
    B: ReservationStore + 'static,
    P: PaymentStore + 'static,
{
    let user = user_id(&headers)?;
    let resource: ResourceId = parse_id(&req.resource_id, "resourceId")?;
    let date = parse_date(&req.date)?;
    let start_time = parse_time(&req.start_time)?;

    let view = state
        .reservations
        .create(user, resource, date, start_time)
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /bookings/{id}
#[tracing::instrument(skip(state))]
pub async fn get<B, P>(
    State(state): State<Arc<AppState<B, P>>>,
    Path(id): Path<String>,
) -> Result<Json<BookingView>, ApiError>
where
    B: ReservationStore + 'static,
    P: PaymentStore + 'static,
{
    let booking_id: BookingId = parse_id(&id, "booking id")?;
    Ok(Json(state.reservations.get_by_id(booking_id).await?))
}

/// PATCH /bookings/{id}/cancel
#[tracing::instrument(skip(state))]
pub async fn cancel<B, P>(
    State(state): State<Arc<AppState<B, P>>>,
    Path(id): Path<String>,
) -> Result<Json<BookingView>, ApiError>
where
    B: ReservationStore + 'static,
    P: PaymentStore + 'static,
{
    let booking_id: BookingId = parse_id(&id, "booking id")?;
    Ok(Json(state.reservations.cancel(booking_id).await?))
}

/// GET /bookings/me: the caller's bookings, newest first.
#[tracing::instrument(skip(state, headers))]
pub async fn mine<B, P>(
    State(state): State<Arc<AppState<B, P>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<BookingView>>, ApiError>
where
    B: ReservationStore + 'static,
    P: PaymentStore + 'static,
{
    let user = user_id(&headers)?;
    Ok(Json(state.reservations.list_by_user(user).await?))
}

/// GET /bookings/availability?resourceId=&date=
#[tracing::instrument(skip(state, query))]
pub async fn availability<B, P>(
    State(state): State<Arc<AppState<B, P>>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<AvailabilitySlot>>, ApiError>
where
    B: ReservationStore + 'static,
    P: PaymentStore + 'static,
{
    let resource: ResourceId = parse_id(&query.resource_id, "resourceId")?;
    let date = parse_date(&query.date)?;
    Ok(Json(state.reservations.get_availability(resource, date).await?))
}
