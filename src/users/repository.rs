use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use super::models::{CreateUserRequest, User, UserUpdate};
use crate::error::{AppError, AppResult};
use crate::money::Money;

const USER_COLUMNS: &str =
    "id, user_name, current_amount, monthly_inputs, monthly_outputs, created_at";

/// Adds a signed amount to a user's stored balance.
#[async_trait]
pub trait UserBalanceStore: Send + Sync {
    async fn add_to_balance(&self, user_id: i64, delta: Money) -> AppResult<User>;
}

pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_user(&self, req: CreateUserRequest) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (user_name, current_amount, monthly_inputs, monthly_outputs)
            VALUES (?, ?, ?, ?)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(req.user_name)
        .bind(req.current_amount)
        .bind(req.monthly_inputs)
        .bind(req.monthly_outputs)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_user(&self, user_id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Writes only the fields present in `update`. An empty update returns the
    /// user unchanged.
    pub async fn update_user(&self, user_id: i64, update: UserUpdate) -> AppResult<User> {
        if update.is_empty() {
            return self
                .get_user(user_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)));
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE users SET ");
        let mut fields = builder.separated(", ");
        if let Some(user_name) = update.user_name {
            fields.push("user_name = ").push_bind_unseparated(user_name);
        }
        if let Some(current_amount) = update.current_amount {
            fields.push("current_amount = ").push_bind_unseparated(current_amount);
        }
        if let Some(monthly_inputs) = update.monthly_inputs {
            fields.push("monthly_inputs = ").push_bind_unseparated(monthly_inputs);
        }
        if let Some(monthly_outputs) = update.monthly_outputs {
            fields.push("monthly_outputs = ").push_bind_unseparated(monthly_outputs);
        }
        builder.push(" WHERE id = ").push_bind(user_id);
        builder.push(format!(" RETURNING {USER_COLUMNS}"));

        builder
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    pub async fn delete_user(&self, user_id: i64) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Adds `monthly_inputs - monthly_outputs` to every user's balance in one
    /// statement. Runs on the caller's connection so it joins the caller's
    /// transaction.
    pub async fn apply_monthly_net_to_all(conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET current_amount = current_amount + (monthly_inputs - monthly_outputs)
            "#,
        )
        .execute(conn)
        .await?;

        debug!("Monthly net applied to {} user(s)", result.rows_affected());
        Ok(result.rows_affected())
    }

    /// First user whose balance would leave the i64 range if the monthly net
    /// were applied now. SQLite reports such sums as REAL.
    pub async fn find_monthly_net_overflow(
        conn: &mut SqliteConnection,
    ) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT id FROM users
            WHERE typeof(current_amount + (monthly_inputs - monthly_outputs)) <> 'integer'
            ORDER BY id
            LIMIT 1
            "#,
        )
        .fetch_optional(conn)
        .await
    }
}

#[async_trait]
impl UserBalanceStore for UserRepository {
    async fn add_to_balance(&self, user_id: i64, delta: Money) -> AppResult<User> {
        let updated = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET current_amount = current_amount + ?
            WHERE id = ? AND typeof(current_amount + ?) = 'integer'
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(delta)
        .bind(user_id)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(user) => Ok(user),
            None if self.get_user(user_id).await?.is_some() => Err(AppError::InvalidInput(
                format!("Adding {} would overflow the balance of user {}", delta, user_id),
            )),
            None => Err(AppError::NotFound(format!("User {} not found", user_id))),
        }
    }
}
