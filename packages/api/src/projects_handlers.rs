// ABOUTME: HTTP request handlers for project operations
// ABOUTME: Project CRUD, member management, and the invitation flow

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::info;

use trellis_projects::{
    AddMemberInput, InviteMemberInput, IssueType, ProjectCreateInput, ProjectRole,
    ProjectUpdateInput,
};

use crate::auth::CurrentUser;
use crate::response::{ApiError, ApiResponse};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub issue_types: Option<Vec<IssueType>>,
}

/// Create a project; the caller becomes its admin
pub async fn create_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Creating project '{}'", request.key);

    if request.key.trim().is_empty() || request.name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Project key and name are required".to_string(),
        ));
    }

    let project = state
        .projects
        .create(
            ProjectCreateInput {
                key: request.key,
                name: request.name,
                description: request.description,
                issue_types: request.issue_types,
            },
            &user,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(project))))
}

/// Projects the caller belongs to
pub async fn list_projects(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let projects = state.projects.find_all(&user).await?;
    Ok(Json(ApiResponse::success(projects)))
}

/// Get a project with its member list
pub async fn get_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let project = state
        .projects
        .find_one_with_members(&project_id, &user)
        .await?;
    Ok(Json(ApiResponse::success(project)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub issue_types: Option<Vec<IssueType>>,
}

/// Update a project (admin only)
pub async fn update_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<String>,
    Json(request): Json<UpdateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Updating project: {}", project_id);

    let project = state
        .projects
        .update(
            &project_id,
            ProjectUpdateInput {
                name: request.name,
                description: request.description,
                issue_types: request.issue_types,
            },
            &user,
        )
        .await?;

    Ok(Json(ApiResponse::success(project)))
}

/// Soft-delete a project (admin only)
pub async fn delete_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Deleting project: {}", project_id);

    state.projects.remove(&project_id, &user).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Project deleted"
    }))))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: String,
    pub role: Option<ProjectRole>,
}

/// Add a member (admin only)
pub async fn add_member(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<String>,
    Json(request): Json<AddMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Adding member {} to project {}", request.user_id, project_id);

    let member = state
        .projects
        .add_member(
            &project_id,
            AddMemberInput {
                user_id: request.user_id,
                role: request.role,
            },
            &user,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(member))))
}

/// Remove a membership row (admin only)
pub async fn remove_member(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((project_id, member_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Removing member {} from project {}", member_id, project_id);

    state
        .projects
        .remove_member(&project_id, &member_id, &user)
        .await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Member removed"
    }))))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteMemberRequest {
    pub email: String,
    pub role: Option<ProjectRole>,
}

/// Invite an email address to the project (admin only)
pub async fn invite_member(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<String>,
    Json(request): Json<InviteMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Inviting {} to project {}", request.email, project_id);

    if !request.email.contains('@') {
        return Err(ApiError::BadRequest(
            "A valid email address is required".to_string(),
        ));
    }

    let invitation = state
        .projects
        .invite_member(
            &project_id,
            InviteMemberInput {
                email: request.email,
                role: request.role,
            },
            &user,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(invitation))))
}

#[derive(Deserialize)]
pub struct InvitationTokenRequest {
    pub token: String,
}

/// Accept a pending invitation addressed to the caller
pub async fn accept_invitation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<InvitationTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let member = state
        .projects
        .accept_invitation(&request.token, &user)
        .await?;
    Ok(Json(ApiResponse::success(member)))
}

/// Decline a pending invitation addressed to the caller
pub async fn decline_invitation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<InvitationTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .projects
        .decline_invitation(&request.token, &user)
        .await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Invitation declined"
    }))))
}
