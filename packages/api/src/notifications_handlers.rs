// ABOUTME: HTTP request handlers for notification operations
// ABOUTME: Per-user listing, unread counts, read transitions, and archiving

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::response::{ApiError, ApiResponse};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListNotificationsParams {
    pub limit: Option<i64>,
}

/// Caller's non-archived notifications, newest first
pub async fn list_notifications(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<ListNotificationsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let notifications = state
        .notifications
        .find_for_user(&user, params.limit)
        .await?;
    Ok(Json(ApiResponse::success(notifications)))
}

/// Count of unread notifications
pub async fn unread_count(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let count = state.notifications.unread_count(&user).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "count": count
    }))))
}

/// Mark one notification as read
pub async fn mark_as_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(notification_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let notification = state
        .notifications
        .mark_as_read(&notification_id, &user)
        .await?;
    Ok(Json(ApiResponse::success(notification)))
}

/// Mark everything unread as read
pub async fn mark_all_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    state.notifications.mark_all_read(&user).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "All notifications marked as read"
    }))))
}

/// Archive a notification; the row is kept
pub async fn archive_notification(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(notification_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .notifications
        .archive(&notification_id, &user)
        .await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Notification archived"
    }))))
}
