// Monthly balance adjustment: month arithmetic, the processed-months log,
// the catch-up engine and its background scheduler.
pub mod engine;
pub mod handlers;
pub mod log;
pub mod month;
pub mod scheduler;

pub use engine::{CatchUpEngine, SystemMonthClock};
pub use log::{AdjustmentLog, AdjustmentLogRepository};
pub use scheduler::start_monthly_adjustment_scheduler;
