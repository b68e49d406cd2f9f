use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

use crate::money::Money;

/// User entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub user_name: String,
    /// Running balance. May be negative.
    pub current_amount: Money,
    pub monthly_inputs: Money,
    pub monthly_outputs: Money,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub user_name: String,
    #[serde(default)]
    pub current_amount: Money,
    #[serde(default)]
    pub monthly_inputs: Money,
    #[serde(default)]
    pub monthly_outputs: Money,
}

/// Partial update: only the fields present in the request are written.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub user_name: Option<String>,
    pub current_amount: Option<Money>,
    pub monthly_inputs: Option<Money>,
    pub monthly_outputs: Option<Money>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.user_name.is_none()
            && self.current_amount.is_none()
            && self.monthly_inputs.is_none()
            && self.monthly_outputs.is_none()
    }
}

/// A single credit or debit against one user's balance.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceChangeRequest {
    pub amount: Money,
    #[serde(default)]
    pub is_debt: bool,
}

impl BalanceChangeRequest {
    /// Debts subtract, credits add.
    pub fn signed_delta(&self) -> Money {
        if self.is_debt {
            -self.amount
        } else {
            self.amount
        }
    }
}

#[derive(Serialize)]
pub struct DeleteUserResponse {
    pub rows_affected: u64,
}
