use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::log::AdjustmentLog;
use super::month::{pending_months, PendingMonths, YearMonth};
use crate::error::AdjustmentError;

/// Source of "now" at month granularity.
pub trait MonthClock: Send + Sync {
    fn current_month(&self) -> YearMonth;
}

/// The host's local calendar month.
pub struct SystemMonthClock;

impl MonthClock for SystemMonthClock {
    fn current_month(&self) -> YearMonth {
        YearMonth::current()
    }
}

/// What a catch-up pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatchUpReport {
    /// First run: `month` was recorded without adjusting any balance.
    Baseline { month: YearMonth },
    /// Nothing to do. `last_processed` may be ahead of `now` on clock skew.
    UpToDate {
        last_processed: YearMonth,
        now: YearMonth,
    },
    /// These months were adjusted, oldest first.
    Applied { months: Vec<YearMonth> },
    /// Another pass was already running; this one did nothing.
    Skipped,
}

impl CatchUpReport {
    pub fn applied_months(&self) -> &[YearMonth] {
        match self {
            CatchUpReport::Applied { months } => months,
            _ => &[],
        }
    }
}

/// Brings the adjustment log up to the current month, one atomic month at a
/// time, oldest first.
pub struct CatchUpEngine {
    log: Arc<dyn AdjustmentLog>,
    clock: Arc<dyn MonthClock>,
    month_timeout: Duration,
    in_flight: Mutex<()>,
}

impl CatchUpEngine {
    pub fn new(
        log: Arc<dyn AdjustmentLog>,
        clock: Arc<dyn MonthClock>,
        month_timeout: Duration,
    ) -> Self {
        Self {
            log,
            clock,
            month_timeout,
            in_flight: Mutex::new(()),
        }
    }

    /// Applies every pending month. Stops at the first failing month; months
    /// applied before it stay applied.
    pub async fn catch_up(&self) -> Result<CatchUpReport, AdjustmentError> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            warn!("⏭️  Catch-up already in progress, skipping this run");
            return Ok(CatchUpReport::Skipped);
        };

        let last = self.log.last_processed_month().await?;
        let now = self.clock.current_month();

        let pending = pending_months(last, now);
        if let (Some(last), true) = (last, pending.is_empty()) {
            if last > now {
                warn!(
                    "Last processed month {} is ahead of the current month {}; check the host clock",
                    last, now
                );
            } else {
                info!("✓ Monthly adjustments up to date (last processed: {})", last);
            }
            return Ok(CatchUpReport::UpToDate {
                last_processed: last,
                now,
            });
        }

        let months = match pending {
            PendingMonths::Baseline(month) => {
                info!(
                    "🆕 First run detected. Recording {} as baseline (no adjustment applied)",
                    month
                );
                self.log.record_month_without_adjustment(month).await?;
                return Ok(CatchUpReport::Baseline { month });
            }
            PendingMonths::Adjust(months) => months,
        };

        info!(
            "🔄 Processing {} pending month(s): {}",
            months.len(),
            months
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut applied = Vec::with_capacity(months.len());
        for month in months {
            if let Err(e) = self.apply_one(month).await {
                if matches!(e, AdjustmentError::Timeout { .. }) {
                    warn!(
                        "⏱️  Outcome of {} unknown: the deadline passed before the commit was confirmed",
                        month
                    );
                }
                error!(
                    "❌ Adjustment for {} failed after {} month(s) applied: {}",
                    month,
                    applied.len(),
                    e
                );
                return Err(e);
            }
            info!("✅ Applied monthly adjustment for {}", month);
            applied.push(month);
        }

        info!("✓ All pending adjustments applied");
        Ok(CatchUpReport::Applied { months: applied })
    }

    /// Entry point for the hosting process.
    pub async fn process_pending_adjustments(&self) -> Result<(), AdjustmentError> {
        let report = self.catch_up().await?;
        debug!(
            "Catch-up pass finished: {} month(s) adjusted",
            report.applied_months().len()
        );
        Ok(())
    }

    async fn apply_one(&self, month: YearMonth) -> Result<(), AdjustmentError> {
        // Dropping the unfinished future drops its transaction, which rolls back.
        tokio::time::timeout(self.month_timeout, self.log.apply_monthly_adjustment(month))
            .await
            .map_err(|_| AdjustmentError::Timeout {
                month,
                after: self.month_timeout,
            })?
    }
}
