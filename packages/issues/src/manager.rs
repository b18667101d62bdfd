// ABOUTME: Issue service with project-membership authorization
// ABOUTME: Reports notify the project admin; terminal transitions stamp resolved_at

use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

use trellis_events::{AppEvent, EventBus};
use trellis_projects::{Project, ProjectStorage};
use trellis_storage::StorageError;
use trellis_tasks::TaskStorage;
use trellis_users::User;

use crate::storage::IssueStorage;
use crate::types::{Issue, IssueCreateInput, IssueUpdateInput};

#[derive(Error, Debug)]
pub enum IssueError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Issue not found")]
    NotFound,
    #[error("Project not found")]
    ProjectNotFound,
    #[error("Linked task not found in this project")]
    TaskNotFound,
    #[error("{0}")]
    Forbidden(&'static str),
}

pub struct IssuesManager {
    storage: IssueStorage,
    projects: ProjectStorage,
    tasks: TaskStorage,
    events: EventBus,
}

impl IssuesManager {
    pub fn new(pool: SqlitePool, events: EventBus) -> Self {
        Self {
            storage: IssueStorage::new(pool.clone()),
            projects: ProjectStorage::new(pool.clone()),
            tasks: TaskStorage::new(pool),
            events,
        }
    }

    async fn require_project_access(
        &self,
        project_id: &str,
        user: &User,
    ) -> Result<Project, IssueError> {
        let project = self
            .projects
            .get_project(project_id)
            .await?
            .ok_or(IssueError::ProjectNotFound)?;

        if !project.is_user_admin(&user.id) && !self.projects.is_member(project_id, &user.id).await?
        {
            return Err(IssueError::Forbidden(
                "You do not have access to this project",
            ));
        }

        Ok(project)
    }

    pub async fn create(
        &self,
        project_id: &str,
        input: IssueCreateInput,
        user: &User,
    ) -> Result<Issue, IssueError> {
        let project = self.require_project_access(project_id, user).await?;

        // A linked task must live in the same project
        if let Some(task_id) = &input.task_id {
            let task = self
                .tasks
                .get_task(task_id)
                .await?
                .ok_or(IssueError::TaskNotFound)?;
            if task.project_id != project_id {
                return Err(IssueError::TaskNotFound);
            }
        }

        let issue = self.storage.create_issue(project_id, &user.id, input).await?;

        info!("Issue {} reported in project {}", issue.id, project_id);

        self.events.publish(AppEvent::IssueReported {
            recipient_id: project.admin_id.clone(),
            project_id: project.id.clone(),
            issue_id: issue.id.clone(),
            message: format!("New issue reported: {}", issue.title),
        });

        Ok(issue)
    }

    pub async fn find_all(&self, project_id: &str, user: &User) -> Result<Vec<Issue>, IssueError> {
        self.require_project_access(project_id, user).await?;
        Ok(self.storage.list_issues(project_id).await?)
    }

    pub async fn find_one(&self, id: &str, user: &User) -> Result<Issue, IssueError> {
        let issue = self.storage.get_issue(id).await?.ok_or(IssueError::NotFound)?;
        self.require_project_access(&issue.project_id, user).await?;
        Ok(issue)
    }

    pub async fn update(
        &self,
        id: &str,
        input: IssueUpdateInput,
        user: &User,
    ) -> Result<Issue, IssueError> {
        let issue = self.find_one(id, user).await?;

        // Stamp resolved_at the first time an issue reaches a terminal status
        let resolved_at = match input.status {
            Some(status)
                if status.is_terminal()
                    && status != issue.status
                    && issue.resolved_at.is_none() =>
            {
                Some(Utc::now())
            }
            _ => None,
        };

        Ok(self.storage.update_issue(id, input, resolved_at).await?)
    }

    /// Only the project admin or the issue reporter may delete an issue
    pub async fn remove(&self, id: &str, user: &User) -> Result<(), IssueError> {
        let issue = self.find_one(id, user).await?;

        let project = self
            .projects
            .get_project(&issue.project_id)
            .await?
            .ok_or(IssueError::ProjectNotFound)?;

        if !project.is_user_admin(&user.id) && issue.reporter_id != user.id {
            return Err(IssueError::Forbidden(
                "You do not have permission to delete this issue",
            ));
        }

        Ok(self.storage.delete_issue(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IssueStatus;
    use trellis_projects::{AddMemberInput, ProjectCreateInput, ProjectsManager};
    use trellis_users::{UserCreateInput, UserStorage};

    struct Ctx {
        manager: IssuesManager,
        events: EventBus,
        ana: User,
        bob: User,
        project_id: String,
    }

    async fn setup() -> Ctx {
        let pool = trellis_storage::connect_in_memory().await.unwrap();
        let events = EventBus::new();
        let users = UserStorage::new(pool.clone());
        let projects = ProjectsManager::new(pool.clone(), events.clone());

        let ana = users
            .create_user(UserCreateInput {
                email: "ana@example.com".to_string(),
                name: "Ana".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        let bob = users
            .create_user(UserCreateInput {
                email: "bob@example.com".to_string(),
                name: "Bob".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();

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
            manager: IssuesManager::new(pool, events.clone()),
            events,
            ana,
            bob,
            project_id: project.id,
        }
    }

    #[tokio::test]
    async fn reporting_an_issue_notifies_the_admin() {
        let ctx = setup().await;
        let mut rx = ctx.events.subscribe();

        let issue = ctx
            .manager
            .create(
                &ctx.project_id,
                IssueCreateInput {
                    title: "Broken build".to_string(),
                    ..Default::default()
                },
                &ctx.bob,
            )
            .await
            .unwrap();

        assert_eq!(issue.status, IssueStatus::Open);

        match rx.recv().await.unwrap() {
            AppEvent::IssueReported {
                recipient_id,
                message,
                ..
            } => {
                assert_eq!(recipient_id, ctx.ana.id);
                assert_eq!(message, "New issue reported: Broken build");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn resolving_stamps_resolved_at_once() {
        let ctx = setup().await;

        let issue = ctx
            .manager
            .create(
                &ctx.project_id,
                IssueCreateInput {
                    title: "Broken build".to_string(),
                    ..Default::default()
                },
                &ctx.bob,
            )
            .await
            .unwrap();
        assert!(issue.resolved_at.is_none());

        let resolved = ctx
            .manager
            .update(
                &issue.id,
                IssueUpdateInput {
                    status: Some(IssueStatus::Resolved),
                    ..Default::default()
                },
                &ctx.bob,
            )
            .await
            .unwrap();
        let stamp = resolved.resolved_at.unwrap();

        // Moving to closed keeps the original stamp
        let closed = ctx
            .manager
            .update(
                &issue.id,
                IssueUpdateInput {
                    status: Some(IssueStatus::Closed),
                    ..Default::default()
                },
                &ctx.bob,
            )
            .await
            .unwrap();
        assert_eq!(closed.resolved_at.unwrap(), stamp);
    }

    #[tokio::test]
    async fn task_link_must_be_in_the_same_project() {
        let ctx = setup().await;

        let result = ctx
            .manager
            .create(
                &ctx.project_id,
                IssueCreateInput {
                    title: "Broken build".to_string(),
                    task_id: Some("ghost-task".to_string()),
                    ..Default::default()
                },
                &ctx.bob,
            )
            .await;

        assert!(matches!(result, Err(IssueError::TaskNotFound)));
    }

    #[tokio::test]
    async fn member_who_is_not_reporter_cannot_delete() {
        let ctx = setup().await;

        let issue = ctx
            .manager
            .create(
                &ctx.project_id,
                IssueCreateInput {
                    title: "Broken build".to_string(),
                    ..Default::default()
                },
                &ctx.ana,
            )
            .await
            .unwrap();

        assert!(matches!(
            ctx.manager.remove(&issue.id, &ctx.bob).await,
            Err(IssueError::Forbidden(_))
        ));

        // The admin can
        ctx.manager.remove(&issue.id, &ctx.ana).await.unwrap();
    }
}
