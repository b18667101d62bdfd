// ABOUTME: In-process publish/subscribe event bus for cross-module side effects
// ABOUTME: Producers emit typed events; the notification listener consumes them

use chrono::{DateTime, Utc};
use tracing::warn;

/// Default capacity for the event broadcast channel
const DEFAULT_EVENT_CHANNEL_SIZE: usize = 256;

/// Events dispatched between modules.
///
/// Producers never call the notification writer directly; they publish one
/// of these and move on. Consumers that lag simply miss events.
#[derive(Debug, Clone)]
pub enum AppEvent {
    TaskAssigned {
        recipient_id: String,
        project_id: String,
        task_id: String,
        message: String,
    },
    TaskUpdated {
        recipient_id: String,
        project_id: String,
        task_id: String,
        message: String,
    },
    IssueReported {
        recipient_id: String,
        project_id: String,
        issue_id: String,
        message: String,
    },
    ProjectInvitationSent {
        recipient_id: String,
        project_id: String,
        project_name: String,
        inviter_name: String,
    },
    AdjustmentRequested {
        recipient_id: String,
        project_id: String,
        task_id: String,
        task_title: String,
    },
    AdjustmentApproved {
        recipient_id: String,
        project_id: String,
        task_id: String,
        task_title: String,
    },
    AdjustmentRejected {
        recipient_id: String,
        project_id: String,
        task_id: String,
        task_title: String,
        reason: String,
    },
    DeadlineReminder {
        recipient_id: String,
        project_id: String,
        task_id: String,
        due_date: DateTime<Utc>,
        days_until_due: i64,
    },
}

/// Broadcast-backed event bus shared through application state
#[derive(Debug, Clone)]
pub struct EventBus {
    event_tx: tokio::sync::broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CHANNEL_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (event_tx, _) = tokio::sync::broadcast::channel(capacity);
        Self { event_tx }
    }

    /// Subscribe to all application events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<AppEvent> {
        self.event_tx.subscribe()
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: AppEvent) {
        // Log errors but don't fail - event delivery is best-effort
        if let Err(e) = self.event_tx.send(event) {
            // Only log if there are receivers (normal case when none are attached)
            if self.event_tx.receiver_count() > 0 {
                warn!("Failed to publish application event: {}", e);
            }
        }
    }

    pub fn receiver_count(&self) -> usize {
        self.event_tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(AppEvent::TaskAssigned {
            recipient_id: "u1".to_string(),
            project_id: "p1".to_string(),
            task_id: "t1".to_string(),
            message: "You have been assigned to task: Fix login".to_string(),
        });

        match rx.recv().await.unwrap() {
            AppEvent::TaskAssigned {
                recipient_id,
                task_id,
                ..
            } => {
                assert_eq!(recipient_id, "u1");
                assert_eq!(task_id, "t1");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_noop() {
        let bus = EventBus::new();
        // Must not panic or error
        bus.publish(AppEvent::TaskUpdated {
            recipient_id: "u1".to_string(),
            project_id: "p1".to_string(),
            task_id: "t1".to_string(),
            message: "Task status changed to: done".to_string(),
        });
        assert_eq!(bus.receiver_count(), 0);
    }

    #[tokio::test]
    async fn multiple_subscribers_each_receive_events() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(AppEvent::IssueReported {
            recipient_id: "admin".to_string(),
            project_id: "p1".to_string(),
            issue_id: "i1".to_string(),
            message: "New issue reported: broken build".to_string(),
        });

        assert!(matches!(
            rx1.recv().await.unwrap(),
            AppEvent::IssueReported { .. }
        ));
        assert!(matches!(
            rx2.recv().await.unwrap(),
            AppEvent::IssueReported { .. }
        ));
    }
}
