// ABOUTME: Shared application state for API handlers
// ABOUTME: Wires the SQLite pool, event bus, and every domain service together

use std::sync::Arc;

use sqlx::SqlitePool;

use trellis_events::EventBus;
use trellis_issues::IssuesManager;
use trellis_notifications::{NotificationStorage, NotificationsManager};
use trellis_projects::ProjectsManager;
use trellis_schedule::ScheduleManager;
use trellis_tasks::{TaskStorage, TasksManager};
use trellis_users::{UserStorage, UsersManager};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt_secret: String,
    pub events: EventBus,
    pub user_storage: Arc<UserStorage>,
    pub users: Arc<UsersManager>,
    pub projects: Arc<ProjectsManager>,
    pub tasks: Arc<TasksManager>,
    pub issues: Arc<IssuesManager>,
    pub notifications: Arc<NotificationsManager>,
    pub notification_storage: Arc<NotificationStorage>,
    pub task_storage: Arc<TaskStorage>,
    pub schedule: Arc<ScheduleManager>,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt_secret: String, events: EventBus) -> Self {
        Self {
            user_storage: Arc::new(UserStorage::new(pool.clone())),
            users: Arc::new(UsersManager::new(pool.clone())),
            projects: Arc::new(ProjectsManager::new(pool.clone(), events.clone())),
            tasks: Arc::new(TasksManager::new(pool.clone(), events.clone())),
            issues: Arc::new(IssuesManager::new(pool.clone(), events.clone())),
            notifications: Arc::new(NotificationsManager::new(pool.clone())),
            notification_storage: Arc::new(NotificationStorage::new(pool.clone())),
            task_storage: Arc::new(TaskStorage::new(pool.clone())),
            schedule: Arc::new(ScheduleManager::new(pool.clone(), events.clone())),
            pool,
            jwt_secret,
            events,
        }
    }
}
