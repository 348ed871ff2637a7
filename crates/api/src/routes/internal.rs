//! Service-to-service endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use booking::{AvailabilitySlot, ReservationStore};
use payment::PaymentStore;
use serde::Deserialize;

use super::parse_date;
use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct DateQuery {
    pub date: String,
}

/// GET /internal/slots?date=: every slot on a date, in any status.
///
/// This is the listing the reconciliation sweep reads.
#[tracing::instrument(skip(state, query), fields(date = %query.date))]
pub async fn slots<B, P>(
    State(state): State<Arc<AppState<B, P>>>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Vec<AvailabilitySlot>>, ApiError>
where
    B: ReservationStore + 'static,
    P: PaymentStore + 'static,
{
    let date = parse_date(&query.date)?;
    let slots = state.reservations.ledger().list_by_date(date).await?;
    Ok(Json(slots.iter().map(AvailabilitySlot::from).collect()))
}
