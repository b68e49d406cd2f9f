use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use super::log::{AdjustmentLog, ProcessedMonth};
use super::month::YearMonth;
use crate::api::handler::AppState;
use crate::error::AppResult;

#[derive(Debug, Serialize)]
pub struct MonthStatusResponse {
    pub year_month: YearMonth,
    pub processed: bool,
}

/// Processed months, newest first
/// GET /adjustments
pub async fn list_adjustments(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ProcessedMonth>>> {
    Ok(Json(state.adjustment_log.list_processed_months().await?))
}

/// GET /adjustments/:year_month
pub async fn get_month_status(
    State(state): State<AppState>,
    Path(year_month): Path<String>,
) -> AppResult<Json<MonthStatusResponse>> {
    let year_month: YearMonth = year_month.parse()?;
    let processed = state.adjustment_log.is_month_processed(year_month).await?;

    Ok(Json(MonthStatusResponse {
        year_month,
        processed,
    }))
}
