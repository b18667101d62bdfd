// ABOUTME: Event-bus listener that materializes notifications
// ABOUTME: One notification row per application event, written in the background

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use trellis_events::{AppEvent, EventBus};

use crate::storage::NotificationStorage;
use crate::types::{NotificationCreateInput, NotificationType};

/// Translate application events into notification rows
pub struct NotificationListener {
    storage: Arc<NotificationStorage>,
}

impl NotificationListener {
    pub fn new(storage: Arc<NotificationStorage>) -> Self {
        Self { storage }
    }

    pub async fn handle(&self, event: AppEvent) -> Result<(), trellis_storage::StorageError> {
        let input = match event {
            AppEvent::TaskAssigned {
                recipient_id,
                project_id,
                task_id,
                message,
            } => NotificationCreateInput {
                recipient_id,
                notification_type: NotificationType::TaskAssignment,
                message,
                project_id: Some(project_id),
                task_id: Some(task_id),
                metadata: None,
            },
            AppEvent::TaskUpdated {
                recipient_id,
                project_id,
                task_id,
                message,
            } => NotificationCreateInput {
                recipient_id,
                notification_type: NotificationType::StatusUpdate,
                message,
                project_id: Some(project_id),
                task_id: Some(task_id),
                metadata: None,
            },
            AppEvent::IssueReported {
                recipient_id,
                project_id,
                issue_id,
                message,
            } => NotificationCreateInput {
                recipient_id,
                notification_type: NotificationType::IssueReported,
                message,
                project_id: Some(project_id),
                task_id: None,
                metadata: Some(serde_json::json!({ "issueId": issue_id })),
            },
            AppEvent::ProjectInvitationSent {
                recipient_id,
                project_id,
                project_name,
                inviter_name,
            } => NotificationCreateInput {
                recipient_id,
                notification_type: NotificationType::ProjectInvitation,
                message: format!(
                    "You have been invited to join {} by {}.",
                    project_name, inviter_name
                ),
                project_id: Some(project_id),
                task_id: None,
                metadata: None,
            },
            AppEvent::AdjustmentRequested {
                recipient_id,
                project_id,
                task_id,
                task_title,
            } => NotificationCreateInput {
                recipient_id,
                notification_type: NotificationType::ScheduleAdjustment,
                message: format!("Schedule adjustment requested for task: {}", task_title),
                project_id: Some(project_id),
                task_id: Some(task_id),
                metadata: None,
            },
            AppEvent::AdjustmentApproved {
                recipient_id,
                project_id,
                task_id,
                task_title,
            } => NotificationCreateInput {
                recipient_id,
                notification_type: NotificationType::ScheduleAdjustment,
                message: format!("Schedule adjustment approved for task: {}", task_title),
                project_id: Some(project_id),
                task_id: Some(task_id),
                metadata: None,
            },
            AppEvent::AdjustmentRejected {
                recipient_id,
                project_id,
                task_id,
                task_title,
                reason,
            } => NotificationCreateInput {
                recipient_id,
                notification_type: NotificationType::ScheduleAdjustment,
                message: format!(
                    "Schedule adjustment rejected for task: {}. Reason: {}",
                    task_title, reason
                ),
                project_id: Some(project_id),
                task_id: Some(task_id),
                metadata: None,
            },
            AppEvent::DeadlineReminder {
                recipient_id,
                project_id,
                task_id,
                days_until_due,
                ..
            } => NotificationCreateInput {
                recipient_id,
                notification_type: NotificationType::DeadlineReminder,
                message: deadline_message(&task_id, days_until_due),
                project_id: Some(project_id),
                task_id: Some(task_id.clone()),
                metadata: Some(
                    serde_json::json!({ "taskId": task_id, "daysUntilDue": days_until_due }),
                ),
            },
        };

        self.storage.create_notification(input).await?;
        Ok(())
    }
}

/// Short task handle plus a human-readable due/overdue phrase
fn deadline_message(task_id: &str, days_until_due: i64) -> String {
    let short_id: String = task_id
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    if days_until_due > 0 {
        format!(
            "Task #{} is due in {} day{}",
            short_id,
            days_until_due,
            if days_until_due > 1 { "s" } else { "" }
        )
    } else {
        let overdue = days_until_due.abs();
        format!(
            "Task #{} is overdue by {} day{}",
            short_id,
            overdue,
            if overdue > 1 { "s" } else { "" }
        )
    }
}

/// Subscribe to the bus and persist notifications until the bus closes.
/// A lagging or failing write never takes the producer side down.
pub fn start_listener(events: &EventBus, storage: Arc<NotificationStorage>) {
    let mut rx = events.subscribe();
    let listener = NotificationListener::new(storage);

    tokio::spawn(async move {
        info!("Notification listener started");

        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Err(e) = listener.handle(event).await {
                        error!("Failed to persist notification: {}", e);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Notification listener lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => {
                    info!("Event bus closed, stopping notification listener");
                    break;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NotificationStatus;
    use trellis_users::{UserCreateInput, UserStorage};

    async fn setup() -> (NotificationListener, Arc<NotificationStorage>, String) {
        let pool = trellis_storage::connect_in_memory().await.unwrap();
        let users = UserStorage::new(pool.clone());
        let ana = users
            .create_user(UserCreateInput {
                email: "ana@example.com".to_string(),
                name: "Ana".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();

        let storage = Arc::new(NotificationStorage::new(pool));
        (NotificationListener::new(storage.clone()), storage, ana.id)
    }

    #[tokio::test]
    async fn task_assignment_event_becomes_an_unread_notification() {
        let (listener, storage, ana) = setup().await;

        listener
            .handle(AppEvent::TaskAssigned {
                recipient_id: ana.clone(),
                project_id: "p1".to_string(),
                task_id: "t1".to_string(),
                message: "You have been assigned to task: Fix login".to_string(),
            })
            .await
            .unwrap();

        let listed = storage.list_for_user(&ana, None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].notification_type, NotificationType::TaskAssignment);
        assert_eq!(listed[0].status, NotificationStatus::Unread);
        assert_eq!(listed[0].task_id.as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn deadline_reminder_carries_metadata_and_message() {
        let (listener, storage, ana) = setup().await;

        listener
            .handle(AppEvent::DeadlineReminder {
                recipient_id: ana.clone(),
                project_id: "p1".to_string(),
                task_id: "task-abcd".to_string(),
                due_date: chrono::Utc::now(),
                days_until_due: 2,
            })
            .await
            .unwrap();

        let listed = storage.list_for_user(&ana, None).await.unwrap();
        assert_eq!(listed[0].message, "Task #abcd is due in 2 days");
        assert_eq!(listed[0].metadata.as_ref().unwrap()["daysUntilDue"], 2);
    }

    #[test]
    fn deadline_messages_handle_singular_and_overdue() {
        assert_eq!(deadline_message("task-abcd", 1), "Task #abcd is due in 1 day");
        assert_eq!(
            deadline_message("task-abcd", -3),
            "Task #abcd is overdue by 3 days"
        );
        assert_eq!(
            deadline_message("task-abcd", -1),
            "Task #abcd is overdue by 1 day"
        );
    }

    #[tokio::test]
    async fn spawned_listener_consumes_bus_events() {
        let (_, storage, ana) = setup().await;
        let events = EventBus::new();

        // The subscription is taken before the task is spawned, so events
        // published right away are not lost.
        start_listener(&events, storage.clone());
        events.publish(AppEvent::TaskAssigned {
            recipient_id: ana.clone(),
            project_id: "p1".to_string(),
            task_id: "t1".to_string(),
            message: "hi".to_string(),
        });

        // Wait for the background write
        for _ in 0..50 {
            if !storage.list_for_user(&ana, None).await.unwrap().is_empty() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("listener never persisted the event");
    }
}
