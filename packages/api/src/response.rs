// ABOUTME: Shared API response types and error handling
// ABOUTME: Provides consistent response format across all API endpoints

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson},
};
use serde::Serialize;
use tracing::error;

use trellis_auth::AuthError;
use trellis_issues::IssueError;
use trellis_notifications::NotificationError;
use trellis_projects::ProjectError;
use trellis_schedule::ScheduleError;
use trellis_storage::StorageError;
use trellis_tasks::TaskError;
use trellis_users::UserError;

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Domain failures mapped onto HTTP statuses
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    pub fn unauthorized() -> Self {
        ApiError::Unauthorized("Unauthorized".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
            ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::Internal(detail) => {
                error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, ResponseJson(ApiResponse::<()>::error(message))).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => ApiError::NotFound("Record not found".to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken | AuthError::InvalidCredentials => ApiError::unauthorized(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound => ApiError::NotFound(err.to_string()),
            UserError::EmailTaken => ApiError::Conflict(err.to_string()),
            UserError::Forbidden => ApiError::Forbidden(err.to_string()),
            UserError::Storage(e) => e.into(),
        }
    }
}

impl From<ProjectError> for ApiError {
    fn from(err: ProjectError) -> Self {
        match err {
            ProjectError::NotFound
            | ProjectError::UserNotFound
            | ProjectError::MemberNotFound
            | ProjectError::InvitationNotFound => ApiError::NotFound(err.to_string()),
            ProjectError::Forbidden(message) => ApiError::Forbidden(message.to_string()),
            ProjectError::DuplicateKey(_) | ProjectError::AlreadyMember => {
                ApiError::Conflict(err.to_string())
            }
            ProjectError::CannotRemoveAdmin | ProjectError::InvalidInvitation(_) => {
                ApiError::BadRequest(err.to_string())
            }
            ProjectError::Storage(e) => e.into(),
        }
    }
}

impl From<TaskError> for ApiError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::NotFound | TaskError::ProjectNotFound | TaskError::AssigneeNotFound => {
                ApiError::NotFound(err.to_string())
            }
            TaskError::Forbidden(message) => ApiError::Forbidden(message.to_string()),
            TaskError::Storage(e) => e.into(),
        }
    }
}

impl From<IssueError> for ApiError {
    fn from(err: IssueError) -> Self {
        match err {
            IssueError::NotFound | IssueError::ProjectNotFound | IssueError::TaskNotFound => {
                ApiError::NotFound(err.to_string())
            }
            IssueError::Forbidden(message) => ApiError::Forbidden(message.to_string()),
            IssueError::Storage(e) => e.into(),
        }
    }
}

impl From<NotificationError> for ApiError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::NotFound => ApiError::NotFound(err.to_string()),
            NotificationError::Forbidden => ApiError::Forbidden(err.to_string()),
            NotificationError::Storage(e) => e.into(),
        }
    }
}

impl From<ScheduleError> for ApiError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::TaskNotFound
            | ScheduleError::ProjectNotFound
            | ScheduleError::AdjustmentNotFound => ApiError::NotFound(err.to_string()),
            ScheduleError::Forbidden(message) => ApiError::Forbidden(message.to_string()),
            ScheduleError::InvalidRequest(message) => ApiError::BadRequest(message),
            ScheduleError::Storage(e) => e.into(),
        }
    }
}
