// ABOUTME: Notification service
// ABOUTME: Recipient-gated listing, read-state transitions, and archiving

use sqlx::SqlitePool;
use thiserror::Error;

use trellis_storage::StorageError;
use trellis_users::User;

use crate::storage::NotificationStorage;
use crate::types::{Notification, NotificationStatus};

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Notification not found")]
    NotFound,
    #[error("You do not have access to this notification")]
    Forbidden,
}

pub struct NotificationsManager {
    storage: NotificationStorage,
}

impl NotificationsManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            storage: NotificationStorage::new(pool),
        }
    }

    pub async fn find_for_user(
        &self,
        user: &User,
        limit: Option<i64>,
    ) -> Result<Vec<Notification>, NotificationError> {
        Ok(self.storage.list_for_user(&user.id, limit).await?)
    }

    pub async fn unread_count(&self, user: &User) -> Result<i64, NotificationError> {
        Ok(self.storage.unread_count(&user.id).await?)
    }

    async fn owned_notification(
        &self,
        id: &str,
        user: &User,
    ) -> Result<Notification, NotificationError> {
        let notification = self
            .storage
            .get_notification(id)
            .await?
            .ok_or(NotificationError::NotFound)?;

        if notification.recipient_id != user.id {
            return Err(NotificationError::Forbidden);
        }

        Ok(notification)
    }

    pub async fn mark_as_read(
        &self,
        id: &str,
        user: &User,
    ) -> Result<Notification, NotificationError> {
        self.owned_notification(id, user).await?;
        self.storage.set_status(id, NotificationStatus::Read).await?;
        self.storage
            .get_notification(id)
            .await?
            .ok_or(NotificationError::NotFound)
    }

    pub async fn mark_all_read(&self, user: &User) -> Result<(), NotificationError> {
        Ok(self.storage.mark_all_read(&user.id).await?)
    }

    /// Notifications are archived, never deleted
    pub async fn archive(&self, id: &str, user: &User) -> Result<(), NotificationError> {
        self.owned_notification(id, user).await?;
        Ok(self
            .storage
            .set_status(id, NotificationStatus::Archived)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NotificationCreateInput, NotificationType};
    use trellis_users::{UserCreateInput, UserStorage};

    struct Ctx {
        manager: NotificationsManager,
        storage: NotificationStorage,
        ana: User,
        bob: User,
    }

    async fn setup() -> Ctx {
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
        let bob = users
            .create_user(UserCreateInput {
                email: "bob@example.com".to_string(),
                name: "Bob".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();

        Ctx {
            manager: NotificationsManager::new(pool.clone()),
            storage: NotificationStorage::new(pool),
            ana,
            bob,
        }
    }

    async fn notify(ctx: &Ctx, recipient: &str) -> Notification {
        ctx.storage
            .create_notification(NotificationCreateInput {
                recipient_id: recipient.to_string(),
                notification_type: NotificationType::TaskAssignment,
                message: "hello".to_string(),
                project_id: None,
                task_id: None,
                metadata: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn recipients_cannot_touch_other_users_notifications() {
        let ctx = setup().await;
        let n = notify(&ctx, &ctx.ana.id).await;

        assert!(matches!(
            ctx.manager.mark_as_read(&n.id, &ctx.bob).await,
            Err(NotificationError::Forbidden)
        ));
        assert!(matches!(
            ctx.manager.archive(&n.id, &ctx.bob).await,
            Err(NotificationError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn mark_as_read_transitions_status() {
        let ctx = setup().await;
        let n = notify(&ctx, &ctx.ana.id).await;

        let read = ctx.manager.mark_as_read(&n.id, &ctx.ana).await.unwrap();
        assert_eq!(read.status, NotificationStatus::Read);
        assert_eq!(ctx.manager.unread_count(&ctx.ana).await.unwrap(), 0);
    }
}
