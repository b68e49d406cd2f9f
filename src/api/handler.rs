use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;

use super::models::HealthResponse;
use crate::{
    adjustment::{AdjustmentLog, AdjustmentLogRepository},
    error::AppResult,
    users::{UserBalanceStore, UserRepository},
};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserRepository>,
    pub balances: Arc<dyn UserBalanceStore>,
    pub adjustment_log: Arc<AdjustmentLogRepository>,
}

/// Health check
/// GET /health
pub async fn health_check(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    let last_processed_month = state.adjustment_log.last_processed_month().await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        last_processed_month,
    }))
}
