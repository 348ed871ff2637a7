//! Assembly of services, adapters and bus consumers from configuration.

use std::sync::Arc;

use availability::{
    AvailabilityCache, BookingEventCacheUpdater, CacheError, HttpSlotSource,
    InMemoryAvailabilityCache, ReconciliationSweep, RestAvailabilityCache, RestCacheConfig,
    SlotSource, SourceError, SweepSettings,
};
use booking::{
    Clock, PaymentOutcomeHandler, ReservationService, ReservationStore, ScheduleHandler,
    ScheduleSettings,
};
use event_bus::{EventBus, EventHandler, spawn_handler};
use payment::{
    BookingCreatedHandler, CheckoutGateway, GatewayError, HttpCheckoutGateway, HttpGatewayConfig,
    InMemoryCheckoutGateway, PaymentCoordinator, PaymentStore, PricingPolicy,
};
use tokio::task::JoinHandle;

use crate::AppState;
use crate::config::{CacheKind, Config, GatewayKind};
use crate::jobs::LedgerSlotSource;

/// Builds the checkout gateway adapter selected by `GATEWAY_KIND`.
pub fn build_gateway(config: &Config) -> Result<Arc<dyn CheckoutGateway>, GatewayError> {
    match config.gateway_kind {
        GatewayKind::InMemory => Ok(Arc::new(InMemoryCheckoutGateway::new())),
        GatewayKind::Http => {
            let gateway = HttpCheckoutGateway::new(HttpGatewayConfig {
                endpoint: config.gateway_url.clone(),
                success_url: config.gateway_success_url.clone(),
                cancel_url: config.gateway_cancel_url.clone(),
                timeout: config.gateway_timeout,
            })?;
            Ok(Arc::new(gateway))
        }
    }
}

/// Builds the availability cache adapter selected by `CACHE_KIND`.
pub fn build_cache(config: &Config) -> Result<Arc<dyn AvailabilityCache>, CacheError> {
    match config.cache_kind {
        CacheKind::InMemory => Ok(Arc::new(InMemoryAvailabilityCache::new())),
        CacheKind::Rest => {
            let cache = RestAvailabilityCache::new(RestCacheConfig {
                base_url: config.cache_url.clone(),
                timeout: config.cache_write_timeout,
            })?;
            Ok(Arc::new(cache))
        }
    }
}

/// Builds the fixed pricing policy, falling back to the default price when
/// the configured one is rejected.
pub fn build_pricing(config: &Config) -> PricingPolicy {
    match PricingPolicy::fixed(config.price_per_slot, config.currency.clone()) {
        Ok(policy) => policy,
        Err(err) => {
            tracing::warn!(error = %err, "invalid pricing configuration, using default price");
            PricingPolicy::default()
        }
    }
}

/// Builds the reservation and payment services over the given stores.
pub fn build_state<B, P>(
    config: &Config,
    reservation_store: B,
    payment_store: P,
    bus: Arc<dyn EventBus>,
    gateway: Arc<dyn CheckoutGateway>,
    clock: Arc<dyn Clock>,
) -> AppState<B, P>
where
    B: ReservationStore,
    P: PaymentStore,
{
    let reservations = ReservationService::new(reservation_store, bus.clone(), clock);
    let payments = PaymentCoordinator::new(payment_store, gateway, bus, build_pricing(config))
        .with_gateway_timeout(config.gateway_timeout)
        .with_webhook_secret(config.webhook_secret.clone());

    AppState {
        reservations,
        payments,
    }
}

/// Builds the slot source the sweep reads: the reservation service over
/// HTTP when `SLOT_SOURCE_URL` is set, the local ledger otherwise.
pub fn build_slot_source<B>(
    config: &Config,
    reservations: &ReservationService<B>,
) -> Result<Arc<dyn SlotSource>, SourceError>
where
    B: ReservationStore + Clone + 'static,
{
    match &config.slot_source_url {
        Some(url) => Ok(Arc::new(HttpSlotSource::new(
            url.clone(),
            config.cache_write_timeout,
        )?)),
        None => Ok(Arc::new(LedgerSlotSource::new(reservations.ledger().clone()))),
    }
}

/// Builds the reconciliation sweep.
pub fn build_sweep(
    config: &Config,
    source: Arc<dyn SlotSource>,
    cache: Arc<dyn AvailabilityCache>,
) -> ReconciliationSweep {
    ReconciliationSweep::new(
        source,
        cache,
        SweepSettings {
            window_days: config.sweep_window_days,
            write_timeout: config.cache_write_timeout,
        },
    )
}

/// Subscribes every saga consumer to the bus.
///
/// Returns the dispatcher tasks; they end when the bus closes.
pub async fn spawn_consumers<B, P>(
    config: &Config,
    bus: &dyn EventBus,
    state: &AppState<B, P>,
    cache: Arc<dyn AvailabilityCache>,
) -> event_bus::Result<Vec<JoinHandle<()>>>
where
    B: ReservationStore + Clone + 'static,
    P: PaymentStore + Clone + 'static,
{
    let handlers: Vec<Arc<dyn EventHandler>> = vec![
        Arc::new(PaymentOutcomeHandler::new(state.reservations.clone())),
        Arc::new(ScheduleHandler::new(
            state.reservations.clone(),
            ScheduleSettings {
                slot_duration_minutes: config.slot_duration_minutes,
                days_forward: config.slot_generation_days,
            },
        )),
        Arc::new(BookingCreatedHandler::new(state.payments.clone())),
        Arc::new(
            BookingEventCacheUpdater::new(cache).with_write_timeout(config.cache_write_timeout),
        ),
    ];

    let mut tasks = Vec::with_capacity(handlers.len());
    for handler in handlers {
        tasks.push(spawn_handler(bus, handler).await?);
    }
    Ok(tasks)
}

/// Waits for dispatcher tasks to finish, logging any that panicked or were
/// cancelled. Returns how many did not end cleanly.
pub async fn join_consumers(tasks: Vec<JoinHandle<()>>) -> usize {
    let mut failed = 0;
    for task in tasks {
        if let Err(err) = task.await {
            failed += 1;
            tracing::error!(
                error = %err,
                panicked = err.is_panic(),
                "bus consumer did not exit cleanly"
            );
        }
    }
    failed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn join_consumers_counts_panicked_tasks() {
        let tasks = vec![
            tokio::spawn(async {}),
            tokio::spawn(async { panic!("handler blew up") }),
            tokio::spawn(async {}),
        ];
        assert_eq!(join_consumers(tasks).await, 1);
    }

    #[tokio::test]
    async fn join_consumers_counts_aborted_tasks() {
        let stuck = tokio::spawn(std::future::pending::<()>());
        stuck.abort();
        assert_eq!(join_consumers(vec![stuck]).await, 1);
        assert_eq!(join_consumers(Vec::new()).await, 0);
    }
}
