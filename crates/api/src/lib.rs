//! HTTP API server for the court booking system.
//!
//! Wires the reservation, payment and availability services to the event
//! bus, exposes their operations over REST and runs the background jobs,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod jobs;
pub mod routes;
pub mod wiring;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use booking::{ReservationService, ReservationStore};
use metrics_exporter_prometheus::PrometheusHandle;
use payment::{PaymentCoordinator, PaymentStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<B, P> {
    pub reservations: ReservationService<B>,
    pub payments: PaymentCoordinator<P>,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<B, P>(state: Arc<AppState<B, P>>, metrics_handle: PrometheusHandle) -> Router
where
    B: ReservationStore + 'static,
    P: PaymentStore + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::ops::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::ops::health))
        .route("/bookings", post(routes::bookings::create::<B, P>))
        .route("/bookings/me", get(routes::bookings::mine::<B, P>))
        .route(
            "/bookings/availability",
            get(routes::bookings::availability::<B, P>),
        )
        .route("/bookings/{id}", get(routes::bookings::get::<B, P>))
        .route("/bookings/{id}/cancel", patch(routes::bookings::cancel::<B, P>))
        .route("/payments/me", get(routes::payments::mine::<B, P>))
        .route("/payments/checkout", post(routes::payments::checkout::<B, P>))
        .route(
            "/payments/booking/{booking_id}",
            get(routes::payments::for_booking::<B, P>),
        )
        .route("/webhook/gateway", post(routes::webhook::gateway::<B, P>))
        .route("/internal/slots", get(routes::internal::slots::<B, P>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
