// ABOUTME: Project service with authorization checks
// ABOUTME: Membership-gated CRUD, member management, and the invitation flow

use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};

use trellis_events::{AppEvent, EventBus};
use trellis_mail::Mailer;
use trellis_storage::StorageError;
use trellis_users::{User, UserStorage};

use crate::storage::ProjectStorage;
use crate::types::{
    AddMemberInput, InvitationStatus, InviteMemberInput, Project, ProjectCreateInput,
    ProjectInvitation, ProjectMember, ProjectRole, ProjectUpdateInput, ProjectWithMembers,
    INVITATION_TTL_DAYS,
};

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Project not found")]
    NotFound,
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("Project with key '{0}' already exists")]
    DuplicateKey(String),
    #[error("User is already a project member")]
    AlreadyMember,
    #[error("User not found")]
    UserNotFound,
    #[error("Member not found")]
    MemberNotFound,
    #[error("The project admin cannot be removed")]
    CannotRemoveAdmin,
    #[error("Invitation not found")]
    InvitationNotFound,
    #[error("{0}")]
    InvalidInvitation(&'static str),
}

pub struct ProjectsManager {
    storage: ProjectStorage,
    users: UserStorage,
    mailer: Mailer,
    events: EventBus,
}

impl ProjectsManager {
    pub fn new(pool: SqlitePool, events: EventBus) -> Self {
        Self {
            storage: ProjectStorage::new(pool.clone()),
            users: UserStorage::new(pool),
            mailer: Mailer::new(),
            events,
        }
    }

    pub fn storage(&self) -> &ProjectStorage {
        &self.storage
    }

    /// Load a project and verify the user is its admin or an active member
    pub async fn find_one(&self, id: &str, user: &User) -> Result<Project, ProjectError> {
        let project = self
            .storage
            .get_project(id)
            .await?
            .ok_or(ProjectError::NotFound)?;

        if !project.is_user_admin(&user.id) && !self.storage.is_member(id, &user.id).await? {
            return Err(ProjectError::Forbidden(
                "You do not have access to this project",
            ));
        }

        Ok(project)
    }

    async fn find_one_admin(&self, id: &str, user: &User) -> Result<Project, ProjectError> {
        let project = self
            .storage
            .get_project(id)
            .await?
            .ok_or(ProjectError::NotFound)?;

        if !project.is_user_admin(&user.id) {
            return Err(ProjectError::Forbidden(
                "Only the project admin can do this",
            ));
        }

        Ok(project)
    }

    pub async fn create(
        &self,
        input: ProjectCreateInput,
        user: &User,
    ) -> Result<Project, ProjectError> {
        if self.storage.get_project_by_key(&input.key).await?.is_some() {
            return Err(ProjectError::DuplicateKey(input.key));
        }

        info!("User {} creating project '{}'", user.id, input.key);
        Ok(self.storage.create_project(&user.id, input).await?)
    }

    pub async fn find_all(&self, user: &User) -> Result<Vec<Project>, ProjectError> {
        Ok(self.storage.list_projects_for_user(&user.id).await?)
    }

    pub async fn find_one_with_members(
        &self,
        id: &str,
        user: &User,
    ) -> Result<ProjectWithMembers, ProjectError> {
        let project = self.find_one(id, user).await?;
        let members = self.storage.list_members(id).await?;
        Ok(ProjectWithMembers { project, members })
    }

    pub async fn update(
        &self,
        id: &str,
        input: ProjectUpdateInput,
        user: &User,
    ) -> Result<Project, ProjectError> {
        self.find_one_admin(id, user).await?;
        Ok(self.storage.update_project(id, input).await?)
    }

    pub async fn remove(&self, id: &str, user: &User) -> Result<(), ProjectError> {
        self.find_one_admin(id, user).await?;
        Ok(self.storage.delete_project(id).await?)
    }

    pub async fn add_member(
        &self,
        id: &str,
        input: AddMemberInput,
        user: &User,
    ) -> Result<ProjectMember, ProjectError> {
        self.find_one_admin(id, user).await?;

        self.users
            .get_active_user(&input.user_id)
            .await
            .map_err(|e| match e {
                StorageError::NotFound => ProjectError::UserNotFound,
                other => ProjectError::Storage(other),
            })?;

        if self.storage.is_member(id, &input.user_id).await? {
            return Err(ProjectError::AlreadyMember);
        }

        let role = input.role.unwrap_or(ProjectRole::Member);
        Ok(self.storage.add_member(id, &input.user_id, role).await?)
    }

    pub async fn remove_member(
        &self,
        id: &str,
        member_id: &str,
        user: &User,
    ) -> Result<(), ProjectError> {
        let project = self.find_one_admin(id, user).await?;

        let member = self
            .storage
            .get_member_by_id(member_id)
            .await?
            .filter(|m| m.project_id == id)
            .ok_or(ProjectError::MemberNotFound)?;

        if member.user_id == project.admin_id {
            return Err(ProjectError::CannotRemoveAdmin);
        }

        Ok(self.storage.deactivate_member(&member.id).await?)
    }

    /// Invite an email address to the project. The invitation email is
    /// logged by the mailer stub; if the address belongs to an existing
    /// user a notification event is published as well.
    pub async fn invite_member(
        &self,
        id: &str,
        input: InviteMemberInput,
        user: &User,
    ) -> Result<ProjectInvitation, ProjectError> {
        let project = self.find_one_admin(id, user).await?;

        let role = input.role.unwrap_or(ProjectRole::Member);
        let token = trellis_core::generate_id();
        let expires_at = Utc::now() + Duration::days(INVITATION_TTL_DAYS);

        let invitation = self
            .storage
            .create_invitation(id, &input.email, role, &token, &user.id, expires_at)
            .await?;

        self.mailer
            .send_invitation_email(&input.email, &user.name, &project.name, &token);

        if let Some(invitee) = self.users.get_user_by_email(&input.email).await? {
            self.events.publish(AppEvent::ProjectInvitationSent {
                recipient_id: invitee.id,
                project_id: project.id.clone(),
                project_name: project.name.clone(),
                inviter_name: user.name.clone(),
            });
        }

        Ok(invitation)
    }

    pub async fn accept_invitation(
        &self,
        token: &str,
        user: &User,
    ) -> Result<ProjectMember, ProjectError> {
        let invitation = self.validate_invitation(token, user).await?;

        let member = self
            .storage
            .add_member(&invitation.project_id, &user.id, invitation.role)
            .await?;

        self.storage
            .set_invitation_status(&invitation.id, InvitationStatus::Accepted)
            .await?;

        debug!(
            "User {} accepted invitation to project {}",
            user.id, invitation.project_id
        );

        Ok(member)
    }

    pub async fn decline_invitation(&self, token: &str, user: &User) -> Result<(), ProjectError> {
        let invitation = self.validate_invitation(token, user).await?;

        self.storage
            .set_invitation_status(&invitation.id, InvitationStatus::Declined)
            .await?;

        Ok(())
    }

    async fn validate_invitation(
        &self,
        token: &str,
        user: &User,
    ) -> Result<ProjectInvitation, ProjectError> {
        let invitation = self
            .storage
            .get_invitation_by_token(token)
            .await?
            .ok_or(ProjectError::InvitationNotFound)?;

        if invitation.status != InvitationStatus::Pending {
            return Err(ProjectError::InvalidInvitation(
                "Invitation is no longer pending",
            ));
        }

        if invitation.expires_at < Utc::now() {
            self.storage
                .set_invitation_status(&invitation.id, InvitationStatus::Expired)
                .await?;
            return Err(ProjectError::InvalidInvitation("Invitation has expired"));
        }

        if !invitation.email.eq_ignore_ascii_case(&user.email) {
            return Err(ProjectError::Forbidden(
                "This invitation was sent to a different email address",
            ));
        }

        Ok(invitation)
    }
}
