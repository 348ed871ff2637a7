//! API server entry point.

use std::sync::Arc;

use api::config::{Config, LogFormat};
use api::error::StartupError;
use api::{jobs, wiring};
use booking::{
    Clock, InMemoryReservationStore, PostgresReservationStore, ReservationStore, SystemClock,
};
use event_bus::{EventBus, InMemoryEventBus};
use metrics_exporter_prometheus::PrometheusHandle;
use payment::{InMemoryPaymentStore, PaymentStore, PostgresPaymentStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn describe_metrics() {
    metrics::describe_counter!("bookings_created_total", "Bookings created");
    metrics::describe_counter!("booking_conflicts_total", "Booking attempts that lost a slot");
    metrics::describe_counter!(
        "booking_payment_outcomes_total",
        "Payment outcomes applied to bookings"
    );
    metrics::describe_counter!("payments_checkout_total", "Checkout attempts by outcome");
    metrics::describe_counter!("payments_callbacks_total", "Gateway callbacks by outcome");
    metrics::describe_counter!(
        "availability_cache_writes_total",
        "Availability cache writes by source and outcome"
    );
    metrics::describe_counter!("reconciliation_runs_total", "Reconciliation sweep runs");
    metrics::describe_histogram!(
        "reconciliation_duration_seconds",
        metrics::Unit::Seconds,
        "Duration of completed reconciliation sweeps"
    );
    metrics::describe_counter!("event_bus_published_total", "Events published by topic");
    metrics::describe_counter!("event_handler_failures_total", "Failed event deliveries");
}

/// Wires every service over the given stores and serves until shutdown.
async fn serve<B, P>(
    config: Config,
    reservation_store: B,
    payment_store: P,
    metrics_handle: PrometheusHandle,
) -> Result<(), StartupError>
where
    B: ReservationStore + Clone + 'static,
    P: PaymentStore + Clone + 'static,
{
    let bus = InMemoryEventBus::new();
    let shared_bus: Arc<dyn EventBus> = Arc::new(bus.clone());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let gateway = wiring::build_gateway(&config)?;
    let cache = wiring::build_cache(&config)?;
    let state = wiring::build_state(
        &config,
        reservation_store,
        payment_store,
        shared_bus,
        gateway,
        clock.clone(),
    );

    let consumers = wiring::spawn_consumers(&config, &bus, &state, cache.clone()).await?;
    tracing::info!(consumers = consumers.len(), "bus consumers running");

    let source = wiring::build_slot_source(&config, &state.reservations)?;
    let sweep = wiring::build_sweep(&config, source, cache);
    let sweep_task = jobs::spawn_sweep(sweep, clock.clone(), config.sweep_interval);
    let purge_task = jobs::spawn_purge(
        state.reservations.ledger().clone(),
        clock,
        config.purge_interval,
    );

    let app = api::create_app(Arc::new(state), metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweep_task.abort();
    purge_task.abort();
    bus.close().await;
    let failed = wiring::join_consumers(consumers).await;
    if failed > 0 {
        tracing::error!(failed, "some bus consumers failed before shutdown");
    }
    Ok(())
}

async fn run(config: Config, metrics_handle: PrometheusHandle) -> Result<(), StartupError> {
    match config.database_url.clone() {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(&url)
                .await?;
            let reservations = PostgresReservationStore::new(pool.clone());
            // One migration set covers both stores
            reservations.run_migrations().await?;
            tracing::info!("connected to PostgreSQL");
            serve(config, reservations, PostgresPaymentStore::new(pool), metrics_handle).await
        }
        None => {
            tracing::warn!("DATABASE_URL not set, state is kept in memory");
            serve(
                config,
                InMemoryReservationStore::new(),
                InMemoryPaymentStore::new(),
                metrics_handle,
            )
            .await
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();
    init_tracing(&config);

    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");
    describe_metrics();

    if let Err(err) = run(config, metrics_handle).await {
        tracing::error!(error = %err, "server stopped with an error");
        std::process::exit(1);
    }

    tracing::info!("server shut down gracefully");
}
