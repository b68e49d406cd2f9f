// Monthly adjustment scheduler
//
// - Runs a catch-up pass immediately on startup
// - Then once per interval (hourly by default)
// - A pass in progress always finishes; cancellation is observed between passes
// - Failed passes are logged and retried on the next tick

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::engine::CatchUpEngine;

pub const DEFAULT_ADJUSTMENT_INTERVAL: Duration = Duration::from_secs(3600);

/// Monthly adjustment scheduler - drives the catch-up engine in the background
pub struct MonthlyAdjustmentScheduler {
    engine: Arc<CatchUpEngine>,
    interval: Duration,
}

impl MonthlyAdjustmentScheduler {
    pub fn new(engine: Arc<CatchUpEngine>, interval: Duration) -> Self {
        Self { engine, interval }
    }

    /// Start the scheduler (runs in background until `shutdown` is cancelled)
    pub fn start(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    async fn run(self, shutdown: CancellationToken) {
        self.run_once("startup").await;

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "⏰ Monthly adjustment scheduler started, checking every {:?}",
            self.interval
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("🛑 Monthly adjustment scheduler stopped");
                    return;
                }
                _ = ticker.tick() => {
                    self.run_once("periodic").await;
                }
            }
        }
    }

    async fn run_once(&self, trigger: &str) {
        if let Err(e) = self.engine.process_pending_adjustments().await {
            error!("❌ Monthly adjustment failed during {} check: {}", trigger, e);
        }
    }
}

/// Starts the scheduler with the given interval and cancellation token.
pub fn start_monthly_adjustment_scheduler(
    engine: Arc<CatchUpEngine>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    MonthlyAdjustmentScheduler::new(engine, interval).start(shutdown)
}
