// ABOUTME: HTTP request handlers for schedule-adjustment operations
// ABOUTME: Workload analysis, reassignment suggestions, and the approval workflow

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use trellis_schedule::{AdjustmentCreateInput, AdjustmentType};
use trellis_tasks::{TaskPriority, TaskStatus};

use crate::auth::CurrentUser;
use crate::response::{ApiError, ApiResponse};
use crate::state::AppState;

/// Per-member workload scores for a project
pub async fn workload_analysis(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Analyzing workload for project {}", project_id);

    let analysis = state
        .schedule
        .analyze_team_workload(&project_id, &user)
        .await?;
    Ok(Json(ApiResponse::success(analysis)))
}

/// Least-loaded reassignment candidates for a task (admin only)
pub async fn optimal_reassignment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((_project_id, task_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let candidates = state
        .schedule
        .find_optimal_reassignment(&task_id, &user)
        .await?;
    Ok(Json(ApiResponse::success(candidates)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdjustmentRequest {
    #[serde(rename = "type")]
    pub adjustment_type: AdjustmentType,
    pub task_id: String,
    pub new_assignee_id: Option<String>,
    pub new_deadline: Option<DateTime<Utc>>,
    pub new_priority: Option<TaskPriority>,
    pub new_status: Option<TaskStatus>,
    pub reason: String,
}

/// Request a schedule adjustment for a task
pub async fn request_adjustment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(_project_id): Path<String>,
    Json(request): Json<CreateAdjustmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!(
        "Requesting {:?} adjustment for task {}",
        request.adjustment_type, request.task_id
    );

    let adjustment = state
        .schedule
        .request_adjustment(
            AdjustmentCreateInput {
                adjustment_type: request.adjustment_type,
                task_id: request.task_id,
                new_assignee_id: request.new_assignee_id,
                new_deadline: request.new_deadline,
                new_priority: request.new_priority,
                new_status: request.new_status,
                reason: request.reason,
            },
            &user,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(adjustment))))
}

/// All adjustments for a project, newest first
pub async fn list_adjustments(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let adjustments = state
        .schedule
        .get_project_adjustments(&project_id, &user)
        .await?;
    Ok(Json(ApiResponse::success(adjustments)))
}

/// Approve a pending adjustment and apply it (admin only)
pub async fn approve_adjustment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((_project_id, adjustment_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Approving adjustment: {}", adjustment_id);

    let adjustment = state
        .schedule
        .approve_adjustment(&adjustment_id, &user)
        .await?;
    Ok(Json(ApiResponse::success(adjustment)))
}

#[derive(Deserialize)]
pub struct RejectAdjustmentRequest {
    pub reason: String,
}

/// Reject a pending adjustment (admin only)
pub async fn reject_adjustment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((_project_id, adjustment_id)): Path<(String, String)>,
    Json(request): Json<RejectAdjustmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Rejecting adjustment: {}", adjustment_id);

    let adjustment = state
        .schedule
        .reject_adjustment(&adjustment_id, &user, request.reason)
        .await?;
    Ok(Json(ApiResponse::success(adjustment)))
}
