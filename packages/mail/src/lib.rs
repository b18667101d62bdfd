// ABOUTME: Outbound mail for Trellis
// ABOUTME: Development stub that logs messages instead of sending them

use tracing::info;

/// Mailer used for project invitations.
///
/// No SMTP transport is wired up; messages are logged so the invitation
/// token can be picked up from the server output during development.
#[derive(Debug, Clone, Default)]
pub struct Mailer;

impl Mailer {
    pub fn new() -> Self {
        Self
    }

    pub fn send_invitation_email(&self, to: &str, from: &str, project_name: &str, token: &str) {
        info!("=== PROJECT INVITATION ===");
        info!("Invited email: {}", to);
        info!("Invited by: {}", from);
        info!("Project: {}", project_name);
        info!("Invitation token: {}", token);
        info!("Use this token against the accept-invitation endpoint");
    }
}
