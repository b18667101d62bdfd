// ABOUTME: Notification storage layer using SQLite
// ABOUTME: Creation, per-user listing, read-state transitions, and archiving

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use trellis_storage::StorageError;

use crate::types::{Notification, NotificationCreateInput, NotificationStatus};

pub struct NotificationStorage {
    pool: SqlitePool,
}

impl NotificationStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_notification(
        &self,
        input: NotificationCreateInput,
    ) -> Result<Notification, StorageError> {
        let notification_id = trellis_core::generate_id();
        let now = Utc::now();

        debug!(
            "Creating {:?} notification for user {}",
            input.notification_type, input.recipient_id
        );

        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, recipient_id, type, message, status, project_id, task_id, metadata, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&notification_id)
        .bind(&input.recipient_id)
        .bind(input.notification_type)
        .bind(&input.message)
        .bind(NotificationStatus::Unread)
        .bind(&input.project_id)
        .bind(&input.task_id)
        .bind(
            input
                .metadata
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        self.get_notification(&notification_id)
            .await?
            .ok_or(StorageError::NotFound)
    }

    pub async fn get_notification(
        &self,
        notification_id: &str,
    ) -> Result<Option<Notification>, StorageError> {
        let row = sqlx::query("SELECT * FROM notifications WHERE id = ?")
            .bind(notification_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        row.as_ref().map(row_to_notification).transpose()
    }

    /// Non-archived notifications for a user, newest first
    pub async fn list_for_user(
        &self,
        user_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<Notification>, StorageError> {
        let mut query = String::from(
            r#"
            SELECT * FROM notifications
            WHERE recipient_id = ? AND status != 'archived'
            ORDER BY created_at DESC
            "#,
        );

        if let Some(limit) = limit {
            query.push_str(&format!(" LIMIT {}", limit));
        }

        let rows = sqlx::query(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        rows.iter().map(row_to_notification).collect()
    }

    pub async fn unread_count(&self, user_id: &str) -> Result<i64, StorageError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = ? AND status = 'unread'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        Ok(count)
    }

    pub async fn set_status(
        &self,
        notification_id: &str,
        status: NotificationStatus,
    ) -> Result<(), StorageError> {
        sqlx::query("UPDATE notifications SET status = ? WHERE id = ?")
            .bind(status)
            .bind(notification_id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: &str) -> Result<(), StorageError> {
        debug!("Marking all notifications read for user {}", user_id);

        sqlx::query(
            "UPDATE notifications SET status = 'read' WHERE recipient_id = ? AND status = 'unread'",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        Ok(())
    }
}

fn row_to_notification(row: &sqlx::sqlite::SqliteRow) -> Result<Notification, StorageError> {
    Ok(Notification {
        id: row.try_get("id")?,
        recipient_id: row.try_get("recipient_id")?,
        notification_type: row.try_get("type")?,
        message: row.try_get("message")?,
        status: row.try_get("status")?,
        project_id: row.try_get("project_id")?,
        task_id: row.try_get("task_id")?,
        metadata: row
            .try_get::<Option<String>, _>("metadata")?
            .and_then(|s| serde_json::from_str(&s).ok()),
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NotificationType;
    use trellis_users::{UserCreateInput, UserStorage};

    async fn setup() -> (NotificationStorage, String) {
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
        (NotificationStorage::new(pool), ana.id)
    }

    fn input(recipient: &str, message: &str) -> NotificationCreateInput {
        NotificationCreateInput {
            recipient_id: recipient.to_string(),
            notification_type: NotificationType::TaskAssignment,
            message: message.to_string(),
            project_id: None,
            task_id: None,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn new_notifications_start_unread() {
        let (storage, ana) = setup().await;

        let n = storage.create_notification(input(&ana, "hello")).await.unwrap();
        assert_eq!(n.status, NotificationStatus::Unread);
        assert_eq!(storage.unread_count(&ana).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn archived_notifications_leave_the_list_but_not_the_table() {
        let (storage, ana) = setup().await;

        let n = storage.create_notification(input(&ana, "hello")).await.unwrap();
        storage
            .set_status(&n.id, NotificationStatus::Archived)
            .await
            .unwrap();

        assert!(storage.list_for_user(&ana, None).await.unwrap().is_empty());
        // Row still exists
        let reloaded = storage.get_notification(&n.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, NotificationStatus::Archived);
    }

    #[tokio::test]
    async fn mark_all_read_clears_the_unread_count() {
        let (storage, ana) = setup().await;

        storage.create_notification(input(&ana, "one")).await.unwrap();
        storage.create_notification(input(&ana, "two")).await.unwrap();
        assert_eq!(storage.unread_count(&ana).await.unwrap(), 2);

        storage.mark_all_read(&ana).await.unwrap();
        assert_eq!(storage.unread_count(&ana).await.unwrap(), 0);

        // Still listed, just read
        assert_eq!(storage.list_for_user(&ana, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn limit_caps_the_listing() {
        let (storage, ana) = setup().await;

        for i in 0..5 {
            storage
                .create_notification(input(&ana, &format!("n{}", i)))
                .await
                .unwrap();
        }

        let limited = storage.list_for_user(&ana, Some(3)).await.unwrap();
        assert_eq!(limited.len(), 3);
    }

    #[tokio::test]
    async fn metadata_round_trips_as_json() {
        let (storage, ana) = setup().await;

        let mut create = input(&ana, "due soon");
        create.notification_type = NotificationType::DeadlineReminder;
        create.metadata = Some(serde_json::json!({"taskId": "t1", "daysUntilDue": 2}));

        let n = storage.create_notification(create).await.unwrap();
        let metadata = n.metadata.unwrap();
        assert_eq!(metadata["daysUntilDue"], 2);
    }
}
