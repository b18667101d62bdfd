// ABOUTME: Notification type definitions
// ABOUTME: Notification kinds, read states, and the create input

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    TaskAssignment,
    StatusUpdate,
    DeadlineReminder,
    IssueReported,
    ProjectInvitation,
    ScheduleAdjustment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Unread,
    Read,
    Archived,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub message: String,
    pub status: NotificationStatus,
    pub project_id: Option<String>,
    pub task_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NotificationCreateInput {
    pub recipient_id: String,
    pub notification_type: NotificationType,
    pub message: String,
    pub project_id: Option<String>,
    pub task_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values_are_snake_case() {
        assert_eq!(
            serde_json::to_string(&NotificationType::TaskAssignment).unwrap(),
            "\"task_assignment\""
        );
        assert_eq!(
            serde_json::to_string(&NotificationType::DeadlineReminder).unwrap(),
            "\"deadline_reminder\""
        );
        assert_eq!(
            serde_json::to_string(&NotificationStatus::Unread).unwrap(),
            "\"unread\""
        );
    }
}
