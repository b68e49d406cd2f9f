use std::{str::FromStr, sync::Arc, time::Duration};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tracing::info;

use crate::{
    adjustment::{AdjustmentLogRepository, CatchUpEngine, SystemMonthClock},
    api::handler::AppState,
    config::Config,
    error::AppResult,
    users::UserRepository,
};

/// Everything the server and the background scheduler share.
pub struct AppComponents {
    pub state: AppState,
    pub engine: Arc<CatchUpEngine>,
}

pub async fn initialize_app_state(config: &Config) -> AppResult<AppComponents> {
    info!("Initializing application components ...");

    let pool = initialize_database(&config.database_url).await?;

    Ok(build_components(pool, config.adjustment_month_timeout))
}

pub fn build_components(pool: SqlitePool, month_timeout: Duration) -> AppComponents {
    let users = Arc::new(UserRepository::new(pool.clone()));
    let adjustment_log = Arc::new(AdjustmentLogRepository::new(pool));

    let engine = Arc::new(CatchUpEngine::new(
        adjustment_log.clone(),
        Arc::new(SystemMonthClock),
        month_timeout,
    ));
    info!(
        "✅ Catch-up engine initialized (per-month timeout {:?})",
        month_timeout
    );

    let state = AppState {
        users: users.clone(),
        balances: users,
        adjustment_log,
    };

    AppComponents { state, engine }
}

async fn initialize_database(database_url: &str) -> AppResult<SqlitePool> {
    info!("📊 Connecting to database...");

    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .connect_with(options)
        .await?;

    info!("✓ Database pool configured: 5 max connections");

    info!("🔄 Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("✓ Database initialized");
    Ok(pool)
}
