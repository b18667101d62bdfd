// ABOUTME: Task service with project-membership authorization
// ABOUTME: CRUD plus assignment/change events published to the notification bus

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

use trellis_events::{AppEvent, EventBus};
use trellis_projects::{Project, ProjectStorage};
use trellis_storage::StorageError;
use trellis_users::{User, UserStorage};

use crate::storage::TaskStorage;
use crate::types::{Task, TaskCreateInput, TaskUpdateInput};

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Task not found")]
    NotFound,
    #[error("Project not found")]
    ProjectNotFound,
    #[error("Assignee not found")]
    AssigneeNotFound,
    #[error("{0}")]
    Forbidden(&'static str),
}

pub struct TasksManager {
    storage: TaskStorage,
    projects: ProjectStorage,
    users: UserStorage,
    events: EventBus,
}

impl TasksManager {
    pub fn new(pool: SqlitePool, events: EventBus) -> Self {
        Self {
            storage: TaskStorage::new(pool.clone()),
            projects: ProjectStorage::new(pool.clone()),
            users: UserStorage::new(pool),
            events,
        }
    }

    pub fn storage(&self) -> &TaskStorage {
        &self.storage
    }

    async fn require_project_access(
        &self,
        project_id: &str,
        user: &User,
    ) -> Result<Project, TaskError> {
        let project = self
            .projects
            .get_project(project_id)
            .await?
            .ok_or(TaskError::ProjectNotFound)?;

        if !project.is_user_admin(&user.id) && !self.projects.is_member(project_id, &user.id).await?
        {
            return Err(TaskError::Forbidden(
                "You do not have access to this project",
            ));
        }

        Ok(project)
    }

    pub async fn create(
        &self,
        project_id: &str,
        input: TaskCreateInput,
        user: &User,
    ) -> Result<Task, TaskError> {
        self.require_project_access(project_id, user).await?;

        if let Some(assignee_id) = &input.assignee_id {
            self.users
                .get_active_user(assignee_id)
                .await
                .map_err(|e| match e {
                    StorageError::NotFound => TaskError::AssigneeNotFound,
                    other => TaskError::Storage(other),
                })?;
        }

        let task = self.storage.create_task(project_id, &user.id, input).await?;

        info!("Task {} created in project {}", task.id, project_id);

        if let Some(assignee_id) = &task.assignee_id {
            self.events.publish(AppEvent::TaskAssigned {
                recipient_id: assignee_id.clone(),
                project_id: task.project_id.clone(),
                task_id: task.id.clone(),
                message: format!("You have been assigned to task: {}", task.title),
            });
        }

        Ok(task)
    }

    pub async fn find_all(&self, project_id: &str, user: &User) -> Result<Vec<Task>, TaskError> {
        self.require_project_access(project_id, user).await?;
        Ok(self.storage.list_tasks(project_id).await?)
    }

    pub async fn find_one(&self, id: &str, user: &User) -> Result<Task, TaskError> {
        let task = self.storage.get_task(id).await?.ok_or(TaskError::NotFound)?;

        let project = self
            .projects
            .get_project(&task.project_id)
            .await?
            .ok_or(TaskError::ProjectNotFound)?;

        if !project.is_user_admin(&user.id)
            && !self.projects.is_member(&task.project_id, &user.id).await?
        {
            return Err(TaskError::Forbidden("You do not have access to this task"));
        }

        Ok(task)
    }

    pub async fn update(
        &self,
        id: &str,
        input: TaskUpdateInput,
        user: &User,
    ) -> Result<Task, TaskError> {
        let task = self.find_one(id, user).await?;

        // Resolve assignee changes before touching the row
        let mut assignee_changed = false;
        if let Some(assignee_id) = &input.assignee_id {
            if assignee_id.is_empty() {
                assignee_changed = task.assignee_id.is_some();
            } else if task.assignee_id.as_deref() != Some(assignee_id.as_str()) {
                self.users
                    .get_active_user(assignee_id)
                    .await
                    .map_err(|e| match e {
                        StorageError::NotFound => TaskError::AssigneeNotFound,
                        other => TaskError::Storage(other),
                    })?;
                assignee_changed = true;
            }
        }

        let updated = self.storage.update_task(id, input.clone()).await?;

        if assignee_changed {
            if let Some(new_assignee) = &updated.assignee_id {
                self.events.publish(AppEvent::TaskAssigned {
                    recipient_id: new_assignee.clone(),
                    project_id: task.project_id.clone(),
                    task_id: task.id.clone(),
                    message: format!("You have been assigned to task: {}", task.title),
                });
            }
        }

        // Change notifications go to whoever was assigned before the update
        if let Some(recipient) = &task.assignee_id {
            if let Some(status) = input.status {
                if status != task.status {
                    self.events.publish(AppEvent::TaskUpdated {
                        recipient_id: recipient.clone(),
                        project_id: task.project_id.clone(),
                        task_id: task.id.clone(),
                        message: format!("Task status changed to: {}", status),
                    });
                }
            }

            if let Some(priority) = input.priority {
                if task.priority != Some(priority) {
                    self.events.publish(AppEvent::TaskUpdated {
                        recipient_id: recipient.clone(),
                        project_id: task.project_id.clone(),
                        task_id: task.id.clone(),
                        message: format!("Task priority changed to: {}", priority),
                    });
                }
            }

            if let Some(due_date) = input.due_date {
                if task.due_date != Some(due_date) {
                    self.events.publish(AppEvent::TaskUpdated {
                        recipient_id: recipient.clone(),
                        project_id: task.project_id.clone(),
                        task_id: task.id.clone(),
                        message: format!(
                            "Task due date changed to: {}",
                            due_date.format("%Y-%m-%d")
                        ),
                    });
                }
            }
        }

        Ok(updated)
    }

    /// Only the project admin or the task reporter may delete a task
    pub async fn remove(&self, id: &str, user: &User) -> Result<(), TaskError> {
        let task = self.find_one(id, user).await?;

        let project = self
            .projects
            .get_project(&task.project_id)
            .await?
            .ok_or(TaskError::ProjectNotFound)?;

        if !project.is_user_admin(&user.id) && task.reporter_id != user.id {
            return Err(TaskError::Forbidden(
                "You do not have permission to delete this task",
            ));
        }

        Ok(self.storage.delete_task(id).await?)
    }

    pub async fn find_by_assignee(&self, user_id: &str) -> Result<Vec<Task>, TaskError> {
        Ok(self.storage.list_tasks_for_assignee(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TaskPriority, TaskStatus};
    use trellis_projects::{AddMemberInput, ProjectCreateInput, ProjectsManager};
    use trellis_users::UserCreateInput;

    struct Ctx {
        manager: TasksManager,
        events: EventBus,
        ana: User,
        bob: User,
        mallory: User,
        project_id: String,
    }

    async fn setup() -> Ctx {
        let pool = trellis_storage::connect_in_memory().await.unwrap();
        let events = EventBus::new();
        let users = UserStorage::new(pool.clone());
        let projects = ProjectsManager::new(pool.clone(), events.clone());

        let mut made = Vec::new();
        for (email, name) in [
            ("ana@example.com", "Ana"),
            ("bob@example.com", "Bob"),
            ("mallory@example.com", "Mallory"),
        ] {
            made.push(
                users
                    .create_user(UserCreateInput {
                        email: email.to_string(),
                        name: name.to_string(),
                        password_hash: "hash".to_string(),
                    })
                    .await
                    .unwrap(),
            );
        }
        let mallory = made.pop().unwrap();
        let bob = made.pop().unwrap();
        let ana = made.pop().unwrap();

        let project = projects
            .create(
                ProjectCreateInput {
                    key: "TRL".to_string(),
                    name: "Trellis".to_string(),
                    description: None,
                    issue_types: None,
                },
                &ana,
            )
            .await
            .unwrap();
        projects
            .add_member(
                &project.id,
                AddMemberInput {
                    user_id: bob.id.clone(),
                    role: None,
                },
                &ana,
            )
            .await
            .unwrap();

        Ctx {
            manager: TasksManager::new(pool, events.clone()),
            events,
            ana,
            bob,
            mallory,
            project_id: project.id,
        }
    }

    #[tokio::test]
    async fn creating_an_assigned_task_notifies_the_assignee() {
        let ctx = setup().await;
        let mut rx = ctx.events.subscribe();

        let task = ctx
            .manager
            .create(
                &ctx.project_id,
                TaskCreateInput {
                    title: "Fix login".to_string(),
                    assignee_id: Some(ctx.bob.id.clone()),
                    ..Default::default()
                },
                &ctx.ana,
            )
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            AppEvent::TaskAssigned {
                recipient_id,
                task_id,
                message,
                ..
            } => {
                assert_eq!(recipient_id, ctx.bob.id);
                assert_eq!(task_id, task.id);
                assert_eq!(message, "You have been assigned to task: Fix login");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn outsiders_are_rejected() {
        let ctx = setup().await;

        let result = ctx
            .manager
            .create(
                &ctx.project_id,
                TaskCreateInput {
                    title: "Sneaky".to_string(),
                    ..Default::default()
                },
                &ctx.mallory,
            )
            .await;
        assert!(matches!(result, Err(TaskError::Forbidden(_))));

        let task = ctx
            .manager
            .create(
                &ctx.project_id,
                TaskCreateInput {
                    title: "Fix login".to_string(),
                    ..Default::default()
                },
                &ctx.ana,
            )
            .await
            .unwrap();

        assert!(matches!(
            ctx.manager.find_one(&task.id, &ctx.mallory).await,
            Err(TaskError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn unknown_assignee_is_rejected() {
        let ctx = setup().await;

        let result = ctx
            .manager
            .create(
                &ctx.project_id,
                TaskCreateInput {
                    title: "Fix login".to_string(),
                    assignee_id: Some("ghost".to_string()),
                    ..Default::default()
                },
                &ctx.ana,
            )
            .await;

        assert!(matches!(result, Err(TaskError::AssigneeNotFound)));
    }

    #[tokio::test]
    async fn status_change_notifies_the_previous_assignee() {
        let ctx = setup().await;

        let task = ctx
            .manager
            .create(
                &ctx.project_id,
                TaskCreateInput {
                    title: "Fix login".to_string(),
                    assignee_id: Some(ctx.bob.id.clone()),
                    ..Default::default()
                },
                &ctx.ana,
            )
            .await
            .unwrap();

        // Subscribe after creation so only update events arrive
        let mut rx = ctx.events.subscribe();

        ctx.manager
            .update(
                &task.id,
                TaskUpdateInput {
                    status: Some(TaskStatus::InProgress),
                    priority: Some(TaskPriority::Urgent),
                    ..Default::default()
                },
                &ctx.bob,
            )
            .await
            .unwrap();

        let mut messages = Vec::new();
        for _ in 0..2 {
            match rx.recv().await.unwrap() {
                AppEvent::TaskUpdated {
                    recipient_id,
                    message,
                    ..
                } => {
                    assert_eq!(recipient_id, ctx.bob.id);
                    messages.push(message);
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }

        assert!(messages.contains(&"Task status changed to: in_progress".to_string()));
        assert!(messages.contains(&"Task priority changed to: urgent".to_string()));
    }

    #[tokio::test]
    async fn reassignment_notifies_the_new_assignee_once() {
        let ctx = setup().await;

        let task = ctx
            .manager
            .create(
                &ctx.project_id,
                TaskCreateInput {
                    title: "Fix login".to_string(),
                    ..Default::default()
                },
                &ctx.ana,
            )
            .await
            .unwrap();

        let mut rx = ctx.events.subscribe();

        ctx.manager
            .update(
                &task.id,
                TaskUpdateInput {
                    assignee_id: Some(ctx.bob.id.clone()),
                    ..Default::default()
                },
                &ctx.ana,
            )
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            AppEvent::TaskAssigned { recipient_id, .. } => assert_eq!(recipient_id, ctx.bob.id),
            other => panic!("unexpected event: {:?}", other),
        }

        // Re-sending the same assignee is not a change
        ctx.manager
            .update(
                &task.id,
                TaskUpdateInput {
                    assignee_id: Some(ctx.bob.id.clone()),
                    ..Default::default()
                },
                &ctx.ana,
            )
            .await
            .unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn only_admin_or_reporter_can_delete() {
        let ctx = setup().await;

        let task = ctx
            .manager
            .create(
                &ctx.project_id,
                TaskCreateInput {
                    title: "Fix login".to_string(),
                    ..Default::default()
                },
                &ctx.ana,
            )
            .await
            .unwrap();

        // Bob is a member but neither the admin nor the reporter
        assert!(matches!(
            ctx.manager.remove(&task.id, &ctx.bob).await,
            Err(TaskError::Forbidden(_))
        ));

        ctx.manager.remove(&task.id, &ctx.ana).await.unwrap();
        assert!(matches!(
            ctx.manager.find_one(&task.id, &ctx.ana).await,
            Err(TaskError::NotFound)
        ));
    }
}
