// ABOUTME: HTTP request handlers for user operations
// ABOUTME: Account listing, profile updates, and per-user task queries

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::info;

use trellis_users::UserUpdateInput;

use crate::auth::CurrentUser;
use crate::response::{ApiError, ApiResponse};
use crate::state::AppState;

/// List active users
pub async fn list_users(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let users = state.users.find_all().await?;
    Ok(Json(ApiResponse::success(users)))
}

/// Get the authenticated user
pub async fn get_current_user(
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(ApiResponse::success(user)))
}

/// Get user by ID
pub async fn get_user(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.users.find_one(&user_id).await?;
    Ok(Json(ApiResponse::success(user)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub password: Option<String>,
}

/// Update a user's own profile
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(current_user): CurrentUser,
    Path(user_id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Updating user: {}", user_id);

    let password_hash = request
        .password
        .as_deref()
        .map(trellis_auth::hash_password)
        .transpose()?;

    let user = state
        .users
        .update(
            &current_user,
            &user_id,
            UserUpdateInput {
                name: request.name,
                password_hash,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(user)))
}

/// Soft-delete a user's own account
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(current_user): CurrentUser,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Deactivating user: {}", user_id);

    state.users.remove(&current_user, &user_id).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Account deactivated"
    }))))
}

/// Active tasks assigned to a user
pub async fn get_user_tasks(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let tasks = state.tasks.find_by_assignee(&user_id).await?;
    Ok(Json(ApiResponse::success(tasks)))
}
