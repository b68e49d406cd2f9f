mod adjustment;
mod api;
mod bootstrap;
mod config;
mod error;
mod money;
mod server;
mod users;

#[cfg(test)]
mod test_support;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::adjustment::start_monthly_adjustment_scheduler;
use crate::config::Config;

// Initialize logging and tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,tower_http=debug,fingo=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    init_tracing();

    info!("🚀 Starting fingo bookkeeping service");

    let config = Config::from_env()?;

    let components = bootstrap::initialize_app_state(&config).await?;

    // Background monthly adjustment, stopped together with the server
    let shutdown = CancellationToken::new();
    let scheduler = start_monthly_adjustment_scheduler(
        components.engine.clone(),
        config.adjustment_interval,
        shutdown.clone(),
    );

    let app = server::create_app(components.state, config.request_timeout);
    let served = server::run_server(app, &config.bind_address, shutdown.clone()).await;

    // Bind failures return before any signal; stop the scheduler either way.
    shutdown.cancel();
    if let Err(e) = scheduler.await {
        error!("❌ Monthly adjustment scheduler panicked: {}", e);
    }

    served?;
    info!("👋 Server stopped");

    Ok(())
}
