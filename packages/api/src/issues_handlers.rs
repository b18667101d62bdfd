// ABOUTME: HTTP request handlers for issue operations
// ABOUTME: Membership-gated issue CRUD nested under a project

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::info;

use trellis_issues::{IssueCreateInput, IssuePriority, IssueStatus, IssueUpdateInput};
use trellis_projects::IssueType;

use crate::auth::CurrentUser;
use crate::response::{ApiError, ApiResponse};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIssueRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub issue_type: Option<IssueType>,
    pub priority: Option<IssuePriority>,
    pub status: Option<IssueStatus>,
    pub task_id: Option<String>,
    pub assignee_id: Option<String>,
}

/// Report an issue in a project
pub async fn create_issue(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<String>,
    Json(request): Json<CreateIssueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Reporting issue '{}' in project {}", request.title, project_id);

    if request.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Issue title is required".to_string()));
    }

    let issue = state
        .issues
        .create(
            &project_id,
            IssueCreateInput {
                title: request.title,
                description: request.description,
                issue_type: request.issue_type,
                priority: request.priority,
                status: request.status,
                task_id: request.task_id,
                assignee_id: request.assignee_id,
            },
            &user,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(issue))))
}

/// List issues in a project, newest first
pub async fn list_issues(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let issues = state.issues.find_all(&project_id, &user).await?;
    Ok(Json(ApiResponse::success(issues)))
}

/// Get a single issue
pub async fn get_issue(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((_project_id, issue_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let issue = state.issues.find_one(&issue_id, &user).await?;
    Ok(Json(ApiResponse::success(issue)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIssueRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub issue_type: Option<IssueType>,
    pub priority: Option<IssuePriority>,
    pub status: Option<IssueStatus>,
    pub assignee_id: Option<String>,
}

/// Update an issue; resolving stamps resolvedAt
pub async fn update_issue(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((_project_id, issue_id)): Path<(String, String)>,
    Json(request): Json<UpdateIssueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Updating issue: {}", issue_id);

    let issue = state
        .issues
        .update(
            &issue_id,
            IssueUpdateInput {
                title: request.title,
                description: request.description,
                issue_type: request.issue_type,
                priority: request.priority,
                status: request.status,
                assignee_id: request.assignee_id,
            },
            &user,
        )
        .await?;

    Ok(Json(ApiResponse::success(issue)))
}

/// Soft-delete an issue (admin or reporter only)
pub async fn delete_issue(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((_project_id, issue_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Deleting issue: {}", issue_id);

    state.issues.remove(&issue_id, &user).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Issue deleted"
    }))))
}
