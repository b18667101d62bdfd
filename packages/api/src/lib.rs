// ABOUTME: HTTP API layer for Trellis providing REST endpoints and routing
// ABOUTME: Integration layer that depends on all domain packages

use axum::{
    routing::{delete, get, patch, post},
    Router,
};

pub mod auth;
pub mod auth_handlers;
pub mod health;
pub mod issues_handlers;
pub mod notifications_handlers;
pub mod projects_handlers;
pub mod response;
pub mod schedule_handlers;
pub mod state;
pub mod tasks_handlers;
pub mod users_handlers;

pub use state::AppState;

/// Creates the auth API router
pub fn create_auth_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth_handlers::register))
        .route("/login", post(auth_handlers::login))
}

/// Creates the users API router
pub fn create_users_router() -> Router<AppState> {
    Router::new()
        .route("/", get(users_handlers::list_users))
        .route("/me", get(users_handlers::get_current_user))
        .route("/{user_id}", get(users_handlers::get_user))
        .route("/{user_id}", patch(users_handlers::update_user))
        .route("/{user_id}", delete(users_handlers::delete_user))
        .route("/{user_id}/tasks", get(users_handlers::get_user_tasks))
}

/// Creates the projects API router
pub fn create_projects_router() -> Router<AppState> {
    Router::new()
        .route("/", get(projects_handlers::list_projects))
        .route("/", post(projects_handlers::create_project))
        .route(
            "/invitations/accept",
            post(projects_handlers::accept_invitation),
        )
        .route(
            "/invitations/decline",
            post(projects_handlers::decline_invitation),
        )
        .route("/{project_id}", get(projects_handlers::get_project))
        .route("/{project_id}", patch(projects_handlers::update_project))
        .route("/{project_id}", delete(projects_handlers::delete_project))
        .route("/{project_id}/members", post(projects_handlers::add_member))
        .route(
            "/{project_id}/members/{member_id}",
            delete(projects_handlers::remove_member),
        )
        .route(
            "/{project_id}/invitations",
            post(projects_handlers::invite_member),
        )
}

/// Creates the tasks API router (nested under /api/projects/{project_id}/tasks)
pub fn create_tasks_router() -> Router<AppState> {
    Router::new()
        .route("/", get(tasks_handlers::list_tasks))
        .route("/", post(tasks_handlers::create_task))
        .route("/{task_id}", get(tasks_handlers::get_task))
        .route("/{task_id}", patch(tasks_handlers::update_task))
        .route("/{task_id}", delete(tasks_handlers::delete_task))
}

/// Creates the issues API router (nested under /api/projects/{project_id}/issues)
pub fn create_issues_router() -> Router<AppState> {
    Router::new()
        .route("/", get(issues_handlers::list_issues))
        .route("/", post(issues_handlers::create_issue))
        .route("/{issue_id}", get(issues_handlers::get_issue))
        .route("/{issue_id}", patch(issues_handlers::update_issue))
        .route("/{issue_id}", delete(issues_handlers::delete_issue))
}

/// Creates the notifications API router
pub fn create_notifications_router() -> Router<AppState> {
    Router::new()
        .route("/", get(notifications_handlers::list_notifications))
        .route(
            "/unread-count",
            get(notifications_handlers::unread_count),
        )
        .route("/read-all", patch(notifications_handlers::mark_all_read))
        .route("/{id}/read", patch(notifications_handlers::mark_as_read))
        .route(
            "/{id}",
            delete(notifications_handlers::archive_notification),
        )
}

/// Creates the schedule-adjustments API router
/// (nested under /api/projects/{project_id}/schedule-adjustments)
pub fn create_schedule_router() -> Router<AppState> {
    Router::new()
        .route("/", get(schedule_handlers::list_adjustments))
        .route("/", post(schedule_handlers::request_adjustment))
        .route(
            "/workload-analysis",
            get(schedule_handlers::workload_analysis),
        )
        .route(
            "/tasks/{task_id}/optimal-reassignment",
            get(schedule_handlers::optimal_reassignment),
        )
        .route(
            "/{adjustment_id}/approve",
            patch(schedule_handlers::approve_adjustment),
        )
        .route(
            "/{adjustment_id}/reject",
            patch(schedule_handlers::reject_adjustment),
        )
}

/// Assemble the full application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::health_check))
        .nest("/api/auth", create_auth_router())
        .nest("/api/users", create_users_router())
        .nest("/api/projects", create_projects_router())
        .nest("/api/projects/{project_id}/tasks", create_tasks_router())
        .nest("/api/projects/{project_id}/issues", create_issues_router())
        .nest(
            "/api/projects/{project_id}/schedule-adjustments",
            create_schedule_router(),
        )
        .nest("/api/notifications", create_notifications_router())
        .with_state(state)
}
