use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;

use crate::adjustment::scheduler::DEFAULT_ADJUSTMENT_INTERVAL;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    /// How often the scheduler looks for a new month.
    pub adjustment_interval: Duration,
    /// Deadline for one month's adjustment transaction.
    pub adjustment_month_timeout: Duration,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let secs = |key: &str, default: Duration| -> Result<Duration, ConfigError> {
            match lookup(key) {
                None => Ok(default),
                Some(raw) => match raw.trim().parse::<u64>() {
                    Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
                    _ => Err(ConfigError::Message(format!(
                        "{} must be a positive number of seconds, got {:?}",
                        key, raw
                    ))),
                },
            }
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://fingo.db".to_string()),
            bind_address: lookup("BIND_ADDRESS")
                .unwrap_or_else(|| "0.0.0.0:8000".to_string()),
            adjustment_interval: secs("ADJUSTMENT_INTERVAL_SECS", DEFAULT_ADJUSTMENT_INTERVAL)?,
            adjustment_month_timeout: secs(
                "ADJUSTMENT_MONTH_TIMEOUT_SECS",
                Duration::from_secs(30),
            )?,
            request_timeout: secs("REQUEST_TIMEOUT_SECS", Duration::from_secs(10))?,
        })
    }
}
