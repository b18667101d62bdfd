// ABOUTME: Project type definitions
// ABOUTME: Projects, membership roles, invitations, and their create/update inputs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trellis_users::User;

/// How long an invitation stays valid after it is sent
pub const INVITATION_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProjectRole {
    Admin,
    Member,
    Viewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
}

/// Issue types a project accepts; every project starts with the full set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    Task,
    Bug,
    Story,
    Epic,
}

impl IssueType {
    pub fn default_set() -> Vec<IssueType> {
        vec![
            IssueType::Task,
            IssueType::Bug,
            IssueType::Story,
            IssueType::Epic,
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub creator_id: String,
    pub admin_id: String,
    pub issue_types: Vec<IssueType>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Check if a user has admin access to this project
    pub fn is_user_admin(&self, user_id: &str) -> bool {
        self.admin_id == user_id
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMember {
    pub id: String,
    pub project_id: String,
    pub user_id: String,
    pub role: ProjectRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    /// Joined user record, populated by storage lookups
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectWithMembers {
    #[serde(flatten)]
    pub project: Project,
    pub members: Vec<ProjectMember>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInvitation {
    pub id: String,
    pub project_id: String,
    pub email: String,
    pub role: ProjectRole,
    pub token: String,
    pub status: InvitationStatus,
    pub invited_by_id: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ProjectCreateInput {
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub issue_types: Option<Vec<IssueType>>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectUpdateInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub issue_types: Option<Vec<IssueType>>,
}

#[derive(Debug, Clone)]
pub struct AddMemberInput {
    pub user_id: String,
    pub role: Option<ProjectRole>,
}

#[derive(Debug, Clone)]
pub struct InviteMemberInput {
    pub email: String,
    pub role: Option<ProjectRole>,
}
