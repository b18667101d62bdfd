// ABOUTME: Projects, membership roles, and invitations for Trellis
// ABOUTME: Entity types, storage layer, and the authorization-aware project service

pub mod manager;
pub mod storage;
pub mod types;

pub use manager::{ProjectError, ProjectsManager};
pub use storage::ProjectStorage;
pub use types::{
    AddMemberInput, InvitationStatus, InviteMemberInput, IssueType, Project, ProjectCreateInput,
    ProjectInvitation, ProjectMember, ProjectRole, ProjectUpdateInput, ProjectWithMembers,
};
