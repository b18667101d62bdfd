// ABOUTME: Project storage layer using SQLite
// ABOUTME: CRUD for projects plus membership and invitation rows

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use trellis_storage::StorageError;

use crate::types::{
    InvitationStatus, Project, ProjectCreateInput, ProjectInvitation, ProjectMember, ProjectRole,
    ProjectUpdateInput,
};

pub struct ProjectStorage {
    pool: SqlitePool,
}

impl ProjectStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a project and enroll the creator as its admin member in one
    /// transaction.
    pub async fn create_project(
        &self,
        creator_id: &str,
        input: ProjectCreateInput,
    ) -> Result<Project, StorageError> {
        let project_id = trellis_core::generate_id();
        let member_id = trellis_core::generate_id();
        let now = Utc::now();
        let issue_types = input
            .issue_types
            .unwrap_or_else(crate::types::IssueType::default_set);

        debug!("Creating project: {} ({})", project_id, input.key);

        let mut tx = self.pool.begin().await.map_err(StorageError::Sqlx)?;

        sqlx::query(
            r#"
            INSERT INTO projects (id, key, name, description, creator_id, admin_id, issue_types, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?)
            "#,
        )
        .bind(&project_id)
        .bind(&input.key)
        .bind(&input.name)
        .bind(&input.description)
        .bind(creator_id)
        .bind(creator_id)
        .bind(serde_json::to_string(&issue_types)?)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(StorageError::Sqlx)?;

        sqlx::query(
            r#"
            INSERT INTO project_members (id, project_id, user_id, role, is_active, created_at)
            VALUES (?, ?, ?, ?, 1, ?)
            "#,
        )
        .bind(&member_id)
        .bind(&project_id)
        .bind(creator_id)
        .bind(ProjectRole::Admin)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(StorageError::Sqlx)?;

        tx.commit().await.map_err(StorageError::Sqlx)?;

        self.get_project(&project_id)
            .await?
            .ok_or(StorageError::NotFound)
    }

    pub async fn get_project(&self, project_id: &str) -> Result<Option<Project>, StorageError> {
        debug!("Fetching project: {}", project_id);

        let row = sqlx::query("SELECT * FROM projects WHERE id = ? AND is_active = 1")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        row.as_ref().map(row_to_project).transpose()
    }

    pub async fn get_project_by_key(&self, key: &str) -> Result<Option<Project>, StorageError> {
        let row = sqlx::query("SELECT * FROM projects WHERE key = ? AND is_active = 1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        row.as_ref().map(row_to_project).transpose()
    }

    /// Projects where the user is the admin or an active member
    pub async fn list_projects_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Project>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT p.*
            FROM projects p
            LEFT JOIN project_members m ON m.project_id = p.id AND m.is_active = 1
            WHERE p.is_active = 1 AND (p.admin_id = ? OR m.user_id = ?)
            ORDER BY p.created_at
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.iter().map(row_to_project).collect()
    }

    pub async fn update_project(
        &self,
        project_id: &str,
        input: ProjectUpdateInput,
    ) -> Result<Project, StorageError> {
        debug!("Updating project: {}", project_id);

        // Build dynamic UPDATE query based on provided fields
        let mut sets: Vec<&str> = Vec::new();

        if input.name.is_some() {
            sets.push("name = ?");
        }
        if input.description.is_some() {
            sets.push("description = ?");
        }
        if input.issue_types.is_some() {
            sets.push("issue_types = ?");
        }

        if !sets.is_empty() {
            let query = format!("UPDATE projects SET {} WHERE id = ?", sets.join(", "));
            let mut q = sqlx::query(&query);

            if let Some(name) = &input.name {
                q = q.bind(name);
            }
            if let Some(description) = &input.description {
                q = q.bind(description);
            }
            if let Some(issue_types) = &input.issue_types {
                q = q.bind(serde_json::to_string(issue_types)?);
            }

            q = q.bind(project_id);
            q.execute(&self.pool).await.map_err(StorageError::Sqlx)?;
        }

        self.get_project(project_id)
            .await?
            .ok_or(StorageError::NotFound)
    }

    pub async fn delete_project(&self, project_id: &str) -> Result<(), StorageError> {
        debug!("Deactivating project: {}", project_id);

        sqlx::query("UPDATE projects SET is_active = 0 WHERE id = ?")
            .bind(project_id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        Ok(())
    }

    // Membership

    pub async fn list_members(&self, project_id: &str) -> Result<Vec<ProjectMember>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT
                m.*,
                u.id as user_id2, u.email as user_email, u.name as user_name,
                u.password_hash as user_password_hash, u.is_active as user_is_active,
                u.created_at as user_created_at, u.updated_at as user_updated_at
            FROM project_members m
            INNER JOIN users u ON u.id = m.user_id
            WHERE m.project_id = ? AND m.is_active = 1
            ORDER BY m.created_at
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.iter().map(|row| row_to_member(row, true)).collect()
    }

    pub async fn get_member(
        &self,
        project_id: &str,
        user_id: &str,
    ) -> Result<Option<ProjectMember>, StorageError> {
        let row = sqlx::query(
            "SELECT * FROM project_members WHERE project_id = ? AND user_id = ? AND is_active = 1",
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        row.as_ref().map(|r| row_to_member(r, false)).transpose()
    }

    pub async fn get_member_by_id(
        &self,
        member_id: &str,
    ) -> Result<Option<ProjectMember>, StorageError> {
        let row = sqlx::query("SELECT * FROM project_members WHERE id = ? AND is_active = 1")
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        row.as_ref().map(|r| row_to_member(r, false)).transpose()
    }

    /// Check if a user is an active member of a project
    pub async fn is_member(&self, project_id: &str, user_id: &str) -> Result<bool, StorageError> {
        Ok(self.get_member(project_id, user_id).await?.is_some())
    }

    /// Insert a membership row, reviving a previously removed one if present
    pub async fn add_member(
        &self,
        project_id: &str,
        user_id: &str,
        role: ProjectRole,
    ) -> Result<ProjectMember, StorageError> {
        let member_id = trellis_core::generate_id();
        let now = Utc::now();

        debug!("Adding member {} to project {}", user_id, project_id);

        sqlx::query(
            r#"
            INSERT INTO project_members (id, project_id, user_id, role, is_active, created_at)
            VALUES (?, ?, ?, ?, 1, ?)
            ON CONFLICT (project_id, user_id)
            DO UPDATE SET role = excluded.role, is_active = 1
            "#,
        )
        .bind(&member_id)
        .bind(project_id)
        .bind(user_id)
        .bind(role)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        self.get_member(project_id, user_id)
            .await?
            .ok_or(StorageError::NotFound)
    }

    pub async fn deactivate_member(&self, member_id: &str) -> Result<(), StorageError> {
        debug!("Removing member: {}", member_id);

        sqlx::query("UPDATE project_members SET is_active = 0 WHERE id = ?")
            .bind(member_id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        Ok(())
    }

    // Invitations

    pub async fn create_invitation(
        &self,
        project_id: &str,
        email: &str,
        role: ProjectRole,
        token: &str,
        invited_by_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<ProjectInvitation, StorageError> {
        let invitation_id = trellis_core::generate_id();
        let now = Utc::now();

        debug!("Creating invitation for {} to project {}", email, project_id);

        sqlx::query(
            r#"
            INSERT INTO project_invitations
                (id, project_id, email, role, token, status, invited_by_id, expires_at, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?)
            "#,
        )
        .bind(&invitation_id)
        .bind(project_id)
        .bind(email)
        .bind(role)
        .bind(token)
        .bind(InvitationStatus::Pending)
        .bind(invited_by_id)
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        self.get_invitation_by_token(token)
            .await?
            .ok_or(StorageError::NotFound)
    }

    pub async fn get_invitation_by_token(
        &self,
        token: &str,
    ) -> Result<Option<ProjectInvitation>, StorageError> {
        let row = sqlx::query("SELECT * FROM project_invitations WHERE token = ? AND is_active = 1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        row.as_ref().map(row_to_invitation).transpose()
    }

    pub async fn set_invitation_status(
        &self,
        invitation_id: &str,
        status: InvitationStatus,
    ) -> Result<(), StorageError> {
        sqlx::query("UPDATE project_invitations SET status = ? WHERE id = ?")
            .bind(status)
            .bind(invitation_id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        Ok(())
    }
}

fn row_to_project(row: &sqlx::sqlite::SqliteRow) -> Result<Project, StorageError> {
    let issue_types: String = row.try_get("issue_types")?;

    Ok(Project {
        id: row.try_get("id")?,
        key: row.try_get("key")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        creator_id: row.try_get("creator_id")?,
        admin_id: row.try_get("admin_id")?,
        issue_types: serde_json::from_str(&issue_types)?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_member(
    row: &sqlx::sqlite::SqliteRow,
    with_user: bool,
) -> Result<ProjectMember, StorageError> {
    let user = if with_user {
        Some(trellis_users::User {
            id: row.try_get("user_id2")?,
            email: row.try_get("user_email")?,
            name: row.try_get("user_name")?,
            password_hash: row.try_get("user_password_hash")?,
            is_active: row.try_get("user_is_active")?,
            created_at: row.try_get("user_created_at")?,
            updated_at: row.try_get("user_updated_at")?,
        })
    } else {
        None
    };

    Ok(ProjectMember {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        user_id: row.try_get("user_id")?,
        role: row.try_get("role")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        user,
    })
}

fn row_to_invitation(row: &sqlx::sqlite::SqliteRow) -> Result<ProjectInvitation, StorageError> {
    Ok(ProjectInvitation {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        email: row.try_get("email")?,
        role: row.try_get("role")?,
        token: row.try_get("token")?,
        status: row.try_get("status")?,
        invited_by_id: row.try_get("invited_by_id")?,
        expires_at: row.try_get("expires_at")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}
