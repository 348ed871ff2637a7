//! Reconciliation sweep: rewrites the cache from the authoritative slot
//! listing for a rolling window of dates.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Days, NaiveDate};
use futures_util::future::join_all;
use tokio::sync::Mutex;

use crate::cache::{AvailabilityCache, write_with_timeout};
use crate::source::SlotSource;
use crate::updater::DEFAULT_WRITE_TIMEOUT;

/// Largest window a sweep will cover.
pub const MAX_WINDOW_DAYS: u32 = 365;

/// Sweep tuning.
#[derive(Debug, Clone)]
pub struct SweepSettings {
    /// Days after today to include; the window is `today ..= today + window_days`,
    /// capped at [`MAX_WINDOW_DAYS`].
    pub window_days: u32,

    /// Bound on each cache write.
    pub write_timeout: Duration,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            window_days: 7,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

/// Totals for one completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub dates_scanned: usize,
    /// Dates whose slot listing could not be fetched.
    pub dates_failed: usize,
    pub slots_written: usize,
    /// Cache writes that failed or timed out.
    pub slots_failed: usize,
}

/// Result of asking the sweep to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    Completed(SweepReport),
    /// Another run was already in progress; this one did nothing.
    Skipped,
}

enum DateResult {
    Swept { written: usize, failed: usize },
    SourceFailed,
}

/// Periodic full rewrite of the availability cache.
///
/// At most one run is in flight per sweep instance. Clones share that guard.
#[derive(Clone)]
pub struct ReconciliationSweep {
    source: Arc<dyn SlotSource>,
    cache: Arc<dyn AvailabilityCache>,
    settings: SweepSettings,
    in_flight: Arc<Mutex<()>>,
}

impl ReconciliationSweep {
    pub fn new(
        source: Arc<dyn SlotSource>,
        cache: Arc<dyn AvailabilityCache>,
        settings: SweepSettings,
    ) -> Self {
        Self {
            source,
            cache,
            settings,
            in_flight: Arc::new(Mutex::new(())),
        }
    }

    pub fn settings(&self) -> &SweepSettings {
        &self.settings
    }

    /// Returns the dates a run starting on `today` covers.
    pub fn window(&self, today: NaiveDate) -> Vec<NaiveDate> {
        (0..=u64::from(self.settings.window_days.min(MAX_WINDOW_DAYS)))
            .filter_map(|offset| today.checked_add_days(Days::new(offset)))
            .collect()
    }

    /// Rewrites the cache entry of every slot in the window starting on `today`.
    ///
    /// Dates are swept concurrently. A failing date or slot is logged and
    /// counted in the report; the rest of the run carries on.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self, today: NaiveDate) -> SweepOutcome {
        let Ok(_guard) = self.in_flight.try_lock() else {
            metrics::counter!("reconciliation_runs_total", "outcome" => "skipped").increment(1);
            tracing::info!("reconciliation already running, skipping");
            return SweepOutcome::Skipped;
        };

        let started = Instant::now();
        let dates = self.window(today);
        let results = join_all(dates.iter().map(|date| self.sweep_date(*date))).await;

        let mut report = SweepReport {
            dates_scanned: dates.len(),
            ..SweepReport::default()
        };
        for result in results {
            match result {
                DateResult::Swept { written, failed } => {
                    report.slots_written += written;
                    report.slots_failed += failed;
                }
                DateResult::SourceFailed => report.dates_failed += 1,
            }
        }

        metrics::counter!("reconciliation_runs_total", "outcome" => "completed").increment(1);
        metrics::histogram!("reconciliation_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(
            dates_scanned = report.dates_scanned,
            dates_failed = report.dates_failed,
            slots_written = report.slots_written,
            slots_failed = report.slots_failed,
            "reconciliation complete"
        );

        SweepOutcome::Completed(report)
    }

    async fn sweep_date(&self, date: NaiveDate) -> DateResult {
        let slots = match self.source.slots_on(date).await {
            Ok(slots) => slots,
            Err(err) => {
                tracing::warn!(%date, error = %err, "failed to list slots for reconciliation");
                return DateResult::SourceFailed;
            }
        };

        let mut written = 0;
        let mut failed = 0;
        for slot in &slots {
            let key = slot.cache_key();
            match write_with_timeout(
                self.cache.as_ref(),
                &key,
                slot.status,
                self.settings.write_timeout,
            )
            .await
            {
                Ok(()) => {
                    written += 1;
                    metrics::counter!(
                        "availability_cache_writes_total",
                        "source" => "sweep",
                        "outcome" => "ok"
                    )
                    .increment(1);
                }
                Err(err) => {
                    failed += 1;
                    metrics::counter!(
                        "availability_cache_writes_total",
                        "source" => "sweep",
                        "outcome" => "error"
                    )
                    .increment(1);
                    tracing::warn!(%key, error = %err, "reconciliation write failed");
                }
            }
        }

        DateResult::Swept { written, failed }
    }
}
