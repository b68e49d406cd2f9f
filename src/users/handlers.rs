use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use super::models::{BalanceChangeRequest, CreateUserRequest, DeleteUserResponse, User, UserUpdate};
use crate::api::handler::AppState;
use crate::error::{AppError, AppResult};

/// GET /users
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.users.list_users().await?))
}

/// GET /users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<User>> {
    let user = state
        .users
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

    Ok(Json(user))
}

/// POST /users
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = state.users.create_user(req).await?;
    info!("👤 Created user {} ({})", user.id, user.user_name);

    Ok((StatusCode::CREATED, Json(user)))
}

/// PATCH /users/:id
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(update): Json<UserUpdate>,
) -> AppResult<Json<User>> {
    Ok(Json(state.users.update_user(user_id, update).await?))
}

/// DELETE /users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<DeleteUserResponse>> {
    let rows_affected = state.users.delete_user(user_id).await?;
    Ok(Json(DeleteUserResponse { rows_affected }))
}

/// Credit or debit one user's balance
/// POST /users/:id/balance
pub async fn change_balance(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(req): Json<BalanceChangeRequest>,
) -> AppResult<Json<User>> {
    let user = state
        .balances
        .add_to_balance(user_id, req.signed_delta())
        .await?;
    info!(
        "💰 Balance of user {} changed by {} (now {})",
        user_id,
        req.signed_delta(),
        user.current_amount
    );

    Ok(Json(user))
}
