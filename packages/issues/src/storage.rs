// ABOUTME: Issue storage layer using SQLite
// ABOUTME: CRUD for issues including resolved_at stamping

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use trellis_storage::StorageError;

use crate::types::{Issue, IssueCreateInput, IssuePriority, IssueStatus, IssueUpdateInput};
use trellis_projects::IssueType;

pub struct IssueStorage {
    pool: SqlitePool,
}

impl IssueStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_issue(
        &self,
        project_id: &str,
        reporter_id: &str,
        input: IssueCreateInput,
    ) -> Result<Issue, StorageError> {
        let issue_id = trellis_core::generate_id();
        let now = Utc::now();
        let issue_type = input.issue_type.unwrap_or(IssueType::Bug);
        let priority = input.priority.unwrap_or(IssuePriority::Medium);
        let status = input.status.unwrap_or(IssueStatus::Open);

        debug!("Creating issue: {} for project: {}", issue_id, project_id);

        sqlx::query(
            r#"
            INSERT INTO issues (
                id, project_id, task_id, title, description, type, priority,
                status, reporter_id, assignee_id, is_active, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?)
            "#,
        )
        .bind(&issue_id)
        .bind(project_id)
        .bind(&input.task_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(issue_type)
        .bind(priority)
        .bind(status)
        .bind(reporter_id)
        .bind(&input.assignee_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        self.get_issue(&issue_id).await?.ok_or(StorageError::NotFound)
    }

    pub async fn get_issue(&self, issue_id: &str) -> Result<Option<Issue>, StorageError> {
        debug!("Fetching issue: {}", issue_id);

        let row = sqlx::query("SELECT * FROM issues WHERE id = ? AND is_active = 1")
            .bind(issue_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        row.as_ref().map(row_to_issue).transpose()
    }

    pub async fn list_issues(&self, project_id: &str) -> Result<Vec<Issue>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM issues
            WHERE project_id = ? AND is_active = 1
            ORDER BY created_at DESC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.iter().map(row_to_issue).collect()
    }

    pub async fn update_issue(
        &self,
        issue_id: &str,
        input: IssueUpdateInput,
        resolved_at: Option<DateTime<Utc>>,
    ) -> Result<Issue, StorageError> {
        debug!("Updating issue: {}", issue_id);

        // Build dynamic UPDATE query based on provided fields
        let mut sets: Vec<&str> = Vec::new();

        if input.title.is_some() {
            sets.push("title = ?");
        }
        if input.description.is_some() {
            sets.push("description = ?");
        }
        if input.issue_type.is_some() {
            sets.push("type = ?");
        }
        if input.priority.is_some() {
            sets.push("priority = ?");
        }
        if input.status.is_some() {
            sets.push("status = ?");
        }
        if input.assignee_id.is_some() {
            sets.push("assignee_id = ?");
        }
        if resolved_at.is_some() {
            sets.push("resolved_at = ?");
        }

        if !sets.is_empty() {
            let query = format!("UPDATE issues SET {} WHERE id = ?", sets.join(", "));
            let mut q = sqlx::query(&query);

            if let Some(title) = &input.title {
                q = q.bind(title);
            }
            if let Some(description) = &input.description {
                q = q.bind(description);
            }
            if let Some(issue_type) = input.issue_type {
                q = q.bind(issue_type);
            }
            if let Some(priority) = input.priority {
                q = q.bind(priority);
            }
            if let Some(status) = input.status {
                q = q.bind(status);
            }
            if let Some(assignee_id) = &input.assignee_id {
                q = q.bind(assignee_id);
            }
            if let Some(resolved) = resolved_at {
                q = q.bind(resolved);
            }

            q = q.bind(issue_id);
            q.execute(&self.pool).await.map_err(StorageError::Sqlx)?;
        }

        self.get_issue(issue_id).await?.ok_or(StorageError::NotFound)
    }

    pub async fn delete_issue(&self, issue_id: &str) -> Result<(), StorageError> {
        debug!("Deactivating issue: {}", issue_id);

        sqlx::query("UPDATE issues SET is_active = 0 WHERE id = ?")
            .bind(issue_id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        Ok(())
    }
}

fn row_to_issue(row: &sqlx::sqlite::SqliteRow) -> Result<Issue, StorageError> {
    Ok(Issue {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        task_id: row.try_get("task_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        issue_type: row.try_get("type")?,
        priority: row.try_get("priority")?,
        status: row.try_get("status")?,
        reporter_id: row.try_get("reporter_id")?,
        assignee_id: row.try_get("assignee_id")?,
        resolved_at: row.try_get("resolved_at")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}
