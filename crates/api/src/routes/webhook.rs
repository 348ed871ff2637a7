//! Checkout gateway callbacks.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use booking::ReservationStore;
use payment::{CallbackResult, PaymentStore};
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;

/// Header carrying the shared webhook secret.
pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

#[derive(Serialize)]
pub struct WebhookResponse {
    pub received: bool,
    pub result: &'static str,
}

/// POST /webhook/gateway
#[tracing::instrument(skip_all)]
pub async fn gateway<B, P>(
    State(state): State<Arc<AppState<B, P>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError>
where
    B: ReservationStore + 'static,
    P: PaymentStore + 'static,
{
    let secret = headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());

    let result = match state.payments.handle_webhook(&body, secret).await? {
        CallbackResult::Settled(_) => "settled",
        CallbackResult::Unchanged(_) => "unchanged",
        CallbackResult::Ignored { .. } => "ignored",
    };

    Ok(Json(WebhookResponse {
        received: true,
        result,
    }))
}
