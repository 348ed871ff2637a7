//! Background jobs: the reconciliation sweep and the retention purge.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use availability::{ReconciliationSweep, SlotSnapshot, SlotSource, SourceError, SweepOutcome};
use booking::{Clock, ReservationStore, SlotLedger};
use chrono::NaiveDate;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Slot source reading the in-process ledger.
pub struct LedgerSlotSource<S> {
    ledger: SlotLedger<S>,
}

impl<S> LedgerSlotSource<S> {
    pub fn new(ledger: SlotLedger<S>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl<S: ReservationStore> SlotSource for LedgerSlotSource<S> {
    async fn slots_on(&self, date: NaiveDate) -> Result<Vec<SlotSnapshot>, SourceError> {
        let slots = self
            .ledger
            .list_by_date(date)
            .await
            .map_err(|err| SourceError::Unavailable(err.to_string()))?;

        Ok(slots
            .into_iter()
            .map(|slot| SlotSnapshot {
                slot_id: slot.id,
                resource_id: slot.resource_id,
                date: slot.date,
                start_time: slot.start_time,
                end_time: slot.end_time,
                status: slot.status,
            })
            .collect())
    }
}

/// Runs the sweep now and then every `every`.
pub fn spawn_sweep(
    sweep: ReconciliationSweep,
    clock: Arc<dyn Clock>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let SweepOutcome::Skipped = sweep.run(clock.today()).await {
                tracing::debug!("previous reconciliation still running");
            }
        }
    })
}

/// Deletes stale unreferenced slots every `every`, starting one interval
/// after startup.
pub fn spawn_purge<S>(ledger: SlotLedger<S>, clock: Arc<dyn Clock>, every: Duration) -> JoinHandle<()>
where
    S: ReservationStore + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match ledger.purge_stale(clock.today()).await {
                Ok(deleted) => tracing::info!(deleted, "retention purge complete"),
                Err(err) => tracing::error!(error = %err, "retention purge failed"),
            }
        }
    })
}
