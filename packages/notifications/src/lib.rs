// ABOUTME: Notifications for Trellis users
// ABOUTME: Storage, service, the event-bus listener, and the daily deadline reminder

pub mod listener;
pub mod manager;
pub mod reminder;
pub mod storage;
pub mod types;

pub use listener::start_listener;
pub use manager::{NotificationError, NotificationsManager};
pub use reminder::{start_reminder_job, ReminderJob};
pub use storage::NotificationStorage;
pub use types::{Notification, NotificationCreateInput, NotificationStatus, NotificationType};
