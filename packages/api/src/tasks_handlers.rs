// ABOUTME: HTTP request handlers for task operations
// ABOUTME: Membership-gated task CRUD nested under a project

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;

use trellis_tasks::{TaskCreateInput, TaskPriority, TaskStatus, TaskUpdateInput};

use crate::auth::CurrentUser;
use crate::response::{ApiError, ApiResponse};
use crate::state::AppState;

/// Parse an ISO 8601 timestamp, falling back to a bare date at midnight UTC
fn parse_due_date(date_str: &str) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        return Ok(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid due date: {}", date_str)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<String>,
    pub assignee_id: Option<String>,
}

/// Create a task in a project
pub async fn create_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<String>,
    Json(request): Json<CreateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Creating task '{}' in project {}", request.title, project_id);

    if request.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Task title is required".to_string()));
    }

    let due_date = request
        .due_date
        .as_deref()
        .map(parse_due_date)
        .transpose()?;

    let task = state
        .tasks
        .create(
            &project_id,
            TaskCreateInput {
                title: request.title,
                description: request.description,
                status: request.status,
                priority: request.priority,
                due_date,
                assignee_id: request.assignee_id,
            },
            &user,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(task))))
}

/// List tasks in a project, newest first
pub async fn list_tasks(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let tasks = state.tasks.find_all(&project_id, &user).await?;
    Ok(Json(ApiResponse::success(tasks)))
}

/// Get a single task
pub async fn get_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((_project_id, task_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.tasks.find_one(&task_id, &user).await?;
    Ok(Json(ApiResponse::success(task)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<String>,
    pub assignee_id: Option<String>,
}

/// Update a task; an empty assigneeId clears the assignment
pub async fn update_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((_project_id, task_id)): Path<(String, String)>,
    Json(request): Json<UpdateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Updating task: {}", task_id);

    let due_date = request
        .due_date
        .as_deref()
        .map(parse_due_date)
        .transpose()?;

    let task = state
        .tasks
        .update(
            &task_id,
            TaskUpdateInput {
                title: request.title,
                description: request.description,
                status: request.status,
                priority: request.priority,
                due_date,
                assignee_id: request.assignee_id,
            },
            &user,
        )
        .await?;

    Ok(Json(ApiResponse::success(task)))
}

/// Soft-delete a task (admin or reporter only)
pub async fn delete_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((_project_id, task_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Deleting task: {}", task_id);

    state.tasks.remove(&task_id, &user).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Task deleted"
    }))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_dates_accept_rfc3339_and_bare_dates() {
        let full = parse_due_date("2026-09-15T12:30:00Z").unwrap();
        assert_eq!(full.to_rfc3339(), "2026-09-15T12:30:00+00:00");

        let bare = parse_due_date("2026-09-15").unwrap();
        assert_eq!(bare.to_rfc3339(), "2026-09-15T00:00:00+00:00");

        assert!(parse_due_date("not-a-date").is_err());
    }
}
