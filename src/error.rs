use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sqlx::migrate::MigrateError;
use thiserror::Error;

use crate::adjustment::month::YearMonth;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Adjustment error: {0}")]
    Adjustment(#[from] AdjustmentError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// A month string that is not a zero-padded `YYYY-MM`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid month {input:?}: expected YYYY-MM")]
pub struct MonthFormatError {
    pub input: String,
}

impl MonthFormatError {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// Monthly adjustment errors
#[derive(Error, Debug)]
pub enum AdjustmentError {
    #[error(transparent)]
    MonthFormat(#[from] MonthFormatError),

    #[error("Month {0} has already been processed")]
    DuplicateMonth(YearMonth),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),

    /// The month's deadline passed. If it fired after the commit was already
    /// handed to the database the month may still be recorded; the next pass
    /// reads the log and resumes from whatever is durable.
    #[error("Adjustment for {month} did not finish within {after:?} (outcome unknown)")]
    Timeout { month: YearMonth, after: Duration },

    #[error("Adjustment for {month} would overflow the balance of user {user_id}")]
    BalanceOverflow { month: YearMonth, user_id: i64 },
}

impl AdjustmentError {
    /// Wraps a database error raised while recording `month`, recognising the
    /// ledger's uniqueness violation.
    pub fn from_insert(month: YearMonth, error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AdjustmentError::DuplicateMonth(month)
            }
            _ => AdjustmentError::Persistence(error),
        }
    }
}

impl From<MonthFormatError> for AppError {
    fn from(error: MonthFormatError) -> Self {
        AppError::Adjustment(AdjustmentError::MonthFormat(error))
    }
}

/// API error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Not found: {}", what),
                None,
            ),
            AppError::InvalidInput(reason) => (
                StatusCode::BAD_REQUEST,
                "INVALID_INPUT",
                reason,
                None,
            ),
            AppError::Adjustment(AdjustmentError::MonthFormat(err)) => (
                StatusCode::BAD_REQUEST,
                "INVALID_MONTH",
                err.to_string(),
                Some(serde_json::json!({ "input": err.input })),
            ),
            AppError::Adjustment(AdjustmentError::DuplicateMonth(month)) => (
                StatusCode::CONFLICT,
                "MONTH_ALREADY_PROCESSED",
                format!("Month {} has already been processed", month),
                Some(serde_json::json!({ "year_month": month })),
            ),
            AppError::Database(_) | AppError::Adjustment(AdjustmentError::Persistence(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "A database error occurred".to_string(),
                None,
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: message,
            error_code: error_code.to_string(),
            details,
        });

        (status, body).into_response()
    }
}

impl From<MigrateError> for AppError {
    fn from(error: MigrateError) -> Self {
        AppError::Internal(format!("Migration error: {:?}", error))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(error: config::ConfigError) -> Self {
        AppError::Config(error.to_string())
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
