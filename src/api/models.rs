use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::adjustment::month::YearMonth;

// ========== RESPONSE MODELS ==========

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// Latest month recorded by the monthly adjustment, if any.
    pub last_processed_month: Option<YearMonth>,
}
