// ABOUTME: Task storage layer using SQLite
// ABOUTME: CRUD plus the assignee and deadline queries used by schedule analysis

use chrono::{Duration, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use trellis_storage::StorageError;

use crate::types::{Task, TaskCreateInput, TaskStatus, TaskUpdateInput};

/// Reminders look this many days ahead for due tasks
pub const UPCOMING_DEADLINE_DAYS: i64 = 2;

pub struct TaskStorage {
    pool: SqlitePool,
}

impl TaskStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_task(
        &self,
        project_id: &str,
        reporter_id: &str,
        input: TaskCreateInput,
    ) -> Result<Task, StorageError> {
        let task_id = trellis_core::generate_id();
        let now = Utc::now();
        let status = input.status.unwrap_or(TaskStatus::Todo);

        debug!("Creating task: {} for project: {}", task_id, project_id);

        sqlx::query(
            r#"
            INSERT INTO tasks (
                id, project_id, title, description, status, priority,
                due_date, assignee_id, reporter_id, is_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(&task_id)
        .bind(project_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(status)
        .bind(input.priority)
        .bind(input.due_date)
        .bind(&input.assignee_id)
        .bind(reporter_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        self.get_task(&task_id).await?.ok_or(StorageError::NotFound)
    }

    pub async fn get_task(&self, task_id: &str) -> Result<Option<Task>, StorageError> {
        debug!("Fetching task: {}", task_id);

        let row = sqlx::query("SELECT * FROM tasks WHERE id = ? AND is_active = 1")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        row.as_ref().map(row_to_task).transpose()
    }

    pub async fn list_tasks(&self, project_id: &str) -> Result<Vec<Task>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM tasks
            WHERE project_id = ? AND is_active = 1
            ORDER BY created_at DESC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.iter().map(row_to_task).collect()
    }

    pub async fn update_task(
        &self,
        task_id: &str,
        input: TaskUpdateInput,
    ) -> Result<Task, StorageError> {
        debug!("Updating task: {}", task_id);

        // Build dynamic UPDATE query based on provided fields
        let mut query = String::from("UPDATE tasks SET updated_at = ?");
        let mut clear_assignee = false;

        if input.title.is_some() {
            query.push_str(", title = ?");
        }
        if input.description.is_some() {
            query.push_str(", description = ?");
        }
        if input.status.is_some() {
            query.push_str(", status = ?");
        }
        if input.priority.is_some() {
            query.push_str(", priority = ?");
        }
        if input.due_date.is_some() {
            query.push_str(", due_date = ?");
        }
        if let Some(assignee_id) = &input.assignee_id {
            // Empty string clears the assignment
            if assignee_id.is_empty() {
                clear_assignee = true;
                query.push_str(", assignee_id = NULL");
            } else {
                query.push_str(", assignee_id = ?");
            }
        }

        query.push_str(" WHERE id = ?");

        let now = Utc::now();
        let mut q = sqlx::query(&query).bind(now);

        if let Some(title) = &input.title {
            q = q.bind(title);
        }
        if let Some(description) = &input.description {
            q = q.bind(description);
        }
        if let Some(status) = input.status {
            q = q.bind(status);
        }
        if let Some(priority) = input.priority {
            q = q.bind(priority);
        }
        if let Some(due_date) = input.due_date {
            q = q.bind(due_date);
        }
        if let Some(assignee_id) = &input.assignee_id {
            if !clear_assignee {
                q = q.bind(assignee_id);
            }
        }

        q = q.bind(task_id);

        q.execute(&self.pool).await.map_err(StorageError::Sqlx)?;

        self.get_task(task_id).await?.ok_or(StorageError::NotFound)
    }

    pub async fn delete_task(&self, task_id: &str) -> Result<(), StorageError> {
        debug!("Deactivating task: {}", task_id);

        sqlx::query("UPDATE tasks SET is_active = 0, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(task_id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        Ok(())
    }

    pub async fn list_tasks_for_assignee(&self, user_id: &str) -> Result<Vec<Task>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM tasks
            WHERE assignee_id = ? AND is_active = 1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.iter().map(row_to_task).collect()
    }

    /// Active, not-done tasks assigned to the user
    pub async fn list_open_tasks_for_assignee(
        &self,
        user_id: &str,
    ) -> Result<Vec<Task>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM tasks
            WHERE assignee_id = ? AND is_active = 1 AND status != ?
            "#,
        )
        .bind(user_id)
        .bind(TaskStatus::Done)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.iter().map(row_to_task).collect()
    }

    /// Active, not-done tasks in a project
    pub async fn list_open_tasks_for_project(
        &self,
        project_id: &str,
    ) -> Result<Vec<Task>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM tasks
            WHERE project_id = ? AND is_active = 1 AND status != ?
            "#,
        )
        .bind(project_id)
        .bind(TaskStatus::Done)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.iter().map(row_to_task).collect()
    }

    /// Active, not-done tasks due within the next two days (or already
    /// overdue). Feeds the daily reminder job.
    pub async fn find_upcoming_deadlines(&self) -> Result<Vec<Task>, StorageError> {
        let cutoff = Utc::now() + Duration::days(UPCOMING_DEADLINE_DAYS);

        let rows = sqlx::query(
            r#"
            SELECT * FROM tasks
            WHERE due_date IS NOT NULL
              AND due_date <= ?
              AND status != ?
              AND is_active = 1
            "#,
        )
        .bind(cutoff)
        .bind(TaskStatus::Done)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.iter().map(row_to_task).collect()
    }
}

fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> Result<Task, StorageError> {
    Ok(Task {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        status: row.try_get("status")?,
        priority: row.try_get("priority")?,
        due_date: row.try_get("due_date")?,
        assignee_id: row.try_get("assignee_id")?,
        reporter_id: row.try_get("reporter_id")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskPriority;
    use trellis_projects::{ProjectCreateInput, ProjectStorage};
    use trellis_users::{User, UserCreateInput, UserStorage};

    struct Ctx {
        tasks: TaskStorage,
        ana: User,
        project_id: String,
    }

    async fn setup() -> Ctx {
        let pool = trellis_storage::connect_in_memory().await.unwrap();
        let users = UserStorage::new(pool.clone());
        let projects = ProjectStorage::new(pool.clone());

        let ana = users
            .create_user(UserCreateInput {
                email: "ana@example.com".to_string(),
                name: "Ana".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();

        let project = projects
            .create_project(
                &ana.id,
                ProjectCreateInput {
                    key: "TRL".to_string(),
                    name: "Trellis".to_string(),
                    description: None,
                    issue_types: None,
                },
            )
            .await
            .unwrap();

        Ctx {
            tasks: TaskStorage::new(pool),
            ana,
            project_id: project.id,
        }
    }

    #[tokio::test]
    async fn create_defaults_to_todo() {
        let ctx = setup().await;

        let task = ctx
            .tasks
            .create_task(
                &ctx.project_id,
                &ctx.ana.id,
                TaskCreateInput {
                    title: "Fix login".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.reporter_id, ctx.ana.id);
        assert!(task.assignee_id.is_none());
    }

    #[tokio::test]
    async fn empty_assignee_clears_assignment() {
        let ctx = setup().await;

        let task = ctx
            .tasks
            .create_task(
                &ctx.project_id,
                &ctx.ana.id,
                TaskCreateInput {
                    title: "Fix login".to_string(),
                    assignee_id: Some(ctx.ana.id.clone()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(task.assignee_id.is_some());

        let updated = ctx
            .tasks
            .update_task(
                &task.id,
                TaskUpdateInput {
                    assignee_id: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.assignee_id.is_none());
    }

    #[tokio::test]
    async fn soft_deleted_tasks_disappear() {
        let ctx = setup().await;

        let task = ctx
            .tasks
            .create_task(
                &ctx.project_id,
                &ctx.ana.id,
                TaskCreateInput {
                    title: "Fix login".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        ctx.tasks.delete_task(&task.id).await.unwrap();

        assert!(ctx.tasks.get_task(&task.id).await.unwrap().is_none());
        assert!(ctx.tasks.list_tasks(&ctx.project_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upcoming_deadlines_exclude_done_and_far_future() {
        let ctx = setup().await;
        let soon = Utc::now() + Duration::days(1);
        let far = Utc::now() + Duration::days(30);

        let due_soon = ctx
            .tasks
            .create_task(
                &ctx.project_id,
                &ctx.ana.id,
                TaskCreateInput {
                    title: "Due soon".to_string(),
                    due_date: Some(soon),
                    priority: Some(TaskPriority::High),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        ctx.tasks
            .create_task(
                &ctx.project_id,
                &ctx.ana.id,
                TaskCreateInput {
                    title: "Due far out".to_string(),
                    due_date: Some(far),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let done = ctx
            .tasks
            .create_task(
                &ctx.project_id,
                &ctx.ana.id,
                TaskCreateInput {
                    title: "Done already".to_string(),
                    due_date: Some(soon),
                    status: Some(TaskStatus::Done),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let upcoming = ctx.tasks.find_upcoming_deadlines().await.unwrap();
        let ids: Vec<&str> = upcoming.iter().map(|t| t.id.as_str()).collect();

        assert!(ids.contains(&due_soon.id.as_str()));
        assert!(!ids.contains(&done.id.as_str()));
        assert_eq!(upcoming.len(), 1);
    }

    #[tokio::test]
    async fn open_task_queries_exclude_done() {
        let ctx = setup().await;

        ctx.tasks
            .create_task(
                &ctx.project_id,
                &ctx.ana.id,
                TaskCreateInput {
                    title: "Open".to_string(),
                    assignee_id: Some(ctx.ana.id.clone()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        ctx.tasks
            .create_task(
                &ctx.project_id,
                &ctx.ana.id,
                TaskCreateInput {
                    title: "Finished".to_string(),
                    assignee_id: Some(ctx.ana.id.clone()),
                    status: Some(TaskStatus::Done),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let open_for_ana = ctx
            .tasks
            .list_open_tasks_for_assignee(&ctx.ana.id)
            .await
            .unwrap();
        assert_eq!(open_for_ana.len(), 1);

        let open_for_project = ctx
            .tasks
            .list_open_tasks_for_project(&ctx.project_id)
            .await
            .unwrap();
        assert_eq!(open_for_project.len(), 1);
    }
}
