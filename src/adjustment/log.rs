use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{prelude::FromRow, SqlitePool};
use tracing::info;

use super::month::YearMonth;
use crate::error::AdjustmentError;
use crate::users::UserRepository;

/// A ledger row as stored.
#[derive(Debug, Clone, FromRow)]
struct ProcessedMonthRow {
    year_month: String,
    adjusted: bool,
    applied_at: DateTime<Utc>,
}

/// A calendar month for which the adjustment decision has been recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedMonth {
    pub year_month: YearMonth,
    /// `false` for the first-run baseline, which changed no balances.
    pub adjusted: bool,
    pub applied_at: DateTime<Utc>,
}

impl TryFrom<ProcessedMonthRow> for ProcessedMonth {
    type Error = AdjustmentError;

    fn try_from(row: ProcessedMonthRow) -> Result<Self, Self::Error> {
        Ok(Self {
            year_month: row.year_month.parse()?,
            adjusted: row.adjusted,
            applied_at: row.applied_at,
        })
    }
}

/// Durable record of processed months, plus the atomic month adjustment.
#[async_trait]
pub trait AdjustmentLog: Send + Sync {
    /// Greatest recorded month, or `None` when nothing was ever recorded.
    async fn last_processed_month(&self) -> Result<Option<YearMonth>, AdjustmentError>;

    async fn is_month_processed(&self, month: YearMonth) -> Result<bool, AdjustmentError>;

    /// Adds each user's monthly net to their balance and records `month`, in one
    /// transaction. Fails with [`AdjustmentError::DuplicateMonth`], changing
    /// nothing, when `month` is already recorded.
    async fn apply_monthly_adjustment(&self, month: YearMonth) -> Result<(), AdjustmentError>;

    /// Records `month` without touching balances. Recording an existing month
    /// is a no-op.
    async fn record_month_without_adjustment(
        &self,
        month: YearMonth,
    ) -> Result<(), AdjustmentError>;
}

/// SQLite-backed adjustment log over `monthly_adjustments_log`.
pub struct AdjustmentLogRepository {
    pool: SqlitePool,
}

impl AdjustmentLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All recorded months, newest first.
    pub async fn list_processed_months(&self) -> Result<Vec<ProcessedMonth>, AdjustmentError> {
        let rows = sqlx::query_as::<_, ProcessedMonthRow>(
            r#"
            SELECT year_month, adjusted, applied_at
            FROM monthly_adjustments_log
            ORDER BY year_month DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ProcessedMonth::try_from).collect()
    }
}

#[async_trait]
impl AdjustmentLog for AdjustmentLogRepository {
    async fn last_processed_month(&self) -> Result<Option<YearMonth>, AdjustmentError> {
        // Zero-padded YYYY-MM sorts chronologically as text.
        let last: Option<String> = sqlx::query_scalar(
            "SELECT year_month FROM monthly_adjustments_log ORDER BY year_month DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(last.map(|month| month.parse::<YearMonth>()).transpose()?)
    }

    async fn is_month_processed(&self, month: YearMonth) -> Result<bool, AdjustmentError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM monthly_adjustments_log WHERE year_month = ?")
                .bind(month.to_string())
                .fetch_one(&self.pool)
                .await?;

        Ok(count > 0)
    }

    async fn apply_monthly_adjustment(&self, month: YearMonth) -> Result<(), AdjustmentError> {
        let mut tx = self.pool.begin().await?;

        // Dropping `tx` on the early return rolls back.
        if let Some(user_id) = UserRepository::find_monthly_net_overflow(&mut *tx).await? {
            return Err(AdjustmentError::BalanceOverflow { month, user_id });
        }

        let users = UserRepository::apply_monthly_net_to_all(&mut *tx).await?;

        sqlx::query("INSERT INTO monthly_adjustments_log (year_month, adjusted) VALUES (?, 1)")
            .bind(month.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| AdjustmentError::from_insert(month, e))?;

        tx.commit().await?;

        info!("✓ Adjustment for {} committed ({} user(s))", month, users);
        Ok(())
    }

    async fn record_month_without_adjustment(
        &self,
        month: YearMonth,
    ) -> Result<(), AdjustmentError> {
        sqlx::query(
            "INSERT OR IGNORE INTO monthly_adjustments_log (year_month, adjusted) VALUES (?, 0)",
        )
        .bind(month.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
