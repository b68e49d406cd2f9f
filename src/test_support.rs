use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use crate::money::Money;

/// Fresh in-memory database with migrations applied. A single connection that
/// never expires keeps the database alive for the pool's lifetime.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");

    pool
}

pub async fn insert_user(pool: &SqlitePool, current: i64, inputs: i64, outputs: i64) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO users (user_name, current_amount, monthly_inputs, monthly_outputs)
        VALUES ('test', ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(current)
    .bind(inputs)
    .bind(outputs)
    .fetch_one(pool)
    .await
    .expect("insert user")
}

pub async fn balance_of(pool: &SqlitePool, user_id: i64) -> Money {
    sqlx::query_scalar("SELECT current_amount FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .expect("user balance")
}
