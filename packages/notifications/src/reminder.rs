// ABOUTME: Daily deadline reminder job
// ABOUTME: Emits DeadlineReminder events for assigned tasks due within the window

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info};

use trellis_events::{AppEvent, EventBus};
use trellis_tasks::TaskStorage;

/// Default hour of day (UTC) for the reminder tick
pub const DEFAULT_REMINDER_HOUR_UTC: u32 = 9;

/// Reminders fire for offsets within this many days, past or future
const REMINDER_WINDOW_DAYS: i64 = 7;

pub struct ReminderJob {
    tasks: Arc<TaskStorage>,
    events: EventBus,
}

impl ReminderJob {
    pub fn new(tasks: Arc<TaskStorage>, events: EventBus) -> Self {
        Self { tasks, events }
    }

    /// One reminder pass: look up upcoming deadlines and emit an event for
    /// every assigned task within the +/- 7 day window.
    pub async fn check_deadlines(&self) -> Result<usize, trellis_storage::StorageError> {
        let now = Utc::now();
        let tasks = self.tasks.find_upcoming_deadlines().await?;

        let mut sent = 0;
        for task in tasks {
            let (Some(due_date), Some(assignee_id)) = (task.due_date, task.assignee_id.clone())
            else {
                continue;
            };

            let days_until_due = days_between(now, due_date);
            if (-REMINDER_WINDOW_DAYS..=REMINDER_WINDOW_DAYS).contains(&days_until_due) {
                self.events.publish(AppEvent::DeadlineReminder {
                    recipient_id: assignee_id,
                    project_id: task.project_id.clone(),
                    task_id: task.id.clone(),
                    due_date,
                    days_until_due,
                });
                sent += 1;
            }
        }

        info!("Sent {} deadline reminders", sent);
        Ok(sent)
    }
}

/// Whole days from `now` until `due`, rounded up
fn days_between(now: DateTime<Utc>, due: DateTime<Utc>) -> i64 {
    let seconds = (due - now).num_seconds();
    (seconds as f64 / 86_400.0).ceil() as i64
}

/// Next occurrence of the given UTC hour strictly after `now`
fn next_run_at(now: DateTime<Utc>, hour_utc: u32) -> DateTime<Utc> {
    let today_run = now
        .date_naive()
        .and_hms_opt(hour_utc, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or(now);

    if today_run > now {
        today_run
    } else {
        today_run + Duration::days(1)
    }
}

/// Spawn the daily reminder loop. Storage errors are logged and the loop
/// keeps running.
pub fn start_reminder_job(tasks: Arc<TaskStorage>, events: EventBus, hour_utc: u32) {
    let job = ReminderJob::new(tasks, events);

    tokio::spawn(async move {
        info!(
            "Deadline reminder job scheduled daily at {:02}:00 UTC",
            hour_utc
        );

        loop {
            let now = Utc::now();
            let next = next_run_at(now, hour_utc);
            let wait = (next - now)
                .to_std()
                .unwrap_or(std::time::Duration::from_secs(60));

            tokio::time::sleep(wait).await;

            if let Err(e) = job.check_deadlines().await {
                error!("Deadline check failed: {}", e);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use trellis_projects::{ProjectCreateInput, ProjectStorage};
    use trellis_tasks::{TaskCreateInput, TaskStatus};
    use trellis_users::{UserCreateInput, UserStorage};

    #[test]
    fn next_run_is_later_today_or_tomorrow() {
        let early = Utc.with_ymd_and_hms(2026, 8, 6, 7, 30, 0).unwrap();
        let next = next_run_at(early, 9);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 8, 6, 9, 0, 0).unwrap());

        let late = Utc.with_ymd_and_hms(2026, 8, 6, 10, 0, 0).unwrap();
        let next = next_run_at(late, 9);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 8, 7, 9, 0, 0).unwrap());
    }

    #[test]
    fn day_offsets_round_up() {
        let now = Utc.with_ymd_and_hms(2026, 8, 6, 9, 0, 0).unwrap();
        assert_eq!(days_between(now, now + Duration::hours(2)), 1);
        assert_eq!(days_between(now, now + Duration::hours(30)), 2);
        assert_eq!(days_between(now, now - Duration::hours(30)), -1);
    }

    #[tokio::test]
    async fn reminder_pass_emits_events_for_assigned_tasks_only() {
        let pool = trellis_storage::connect_in_memory().await.unwrap();
        let users = UserStorage::new(pool.clone());
        let projects = ProjectStorage::new(pool.clone());
        let tasks = Arc::new(TaskStorage::new(pool.clone()));
        let events = EventBus::new();

        let ana = users
            .create_user(UserCreateInput {
                email: "ana@example.com".to_string(),
                name: "Ana".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        let project = projects
            .create_project(
                &ana.id,
                ProjectCreateInput {
                    key: "TRL".to_string(),
                    name: "Trellis".to_string(),
                    description: None,
                    issue_types: None,
                },
            )
            .await
            .unwrap();

        // Assigned, due tomorrow: reminded
        tasks
            .create_task(
                &project.id,
                &ana.id,
                TaskCreateInput {
                    title: "Assigned".to_string(),
                    assignee_id: Some(ana.id.clone()),
                    due_date: Some(Utc::now() + Duration::days(1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        // Unassigned, due tomorrow: skipped
        tasks
            .create_task(
                &project.id,
                &ana.id,
                TaskCreateInput {
                    title: "Unassigned".to_string(),
                    due_date: Some(Utc::now() + Duration::days(1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        // Done: skipped by the storage query
        tasks
            .create_task(
                &project.id,
                &ana.id,
                TaskCreateInput {
                    title: "Done".to_string(),
                    assignee_id: Some(ana.id.clone()),
                    due_date: Some(Utc::now() + Duration::days(1)),
                    status: Some(TaskStatus::Done),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let mut rx = events.subscribe();
        let job = ReminderJob::new(tasks, events.clone());
        let sent = job.check_deadlines().await.unwrap();
        assert_eq!(sent, 1);

        match rx.recv().await.unwrap() {
            AppEvent::DeadlineReminder {
                recipient_id,
                days_until_due,
                ..
            } => {
                assert_eq!(recipient_id, ana.id);
                assert_eq!(days_until_due, 1);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn overdue_tasks_outside_the_window_are_skipped() {
        let pool = trellis_storage::connect_in_memory().await.unwrap();
        let users = UserStorage::new(pool.clone());
        let projects = ProjectStorage::new(pool.clone());
        let tasks = Arc::new(TaskStorage::new(pool.clone()));
        let events = EventBus::new();

        let ana = users
            .create_user(UserCreateInput {
                email: "ana@example.com".to_string(),
                name: "Ana".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        let project = projects
            .create_project(
                &ana.id,
                ProjectCreateInput {
                    key: "TRL".to_string(),
                    name: "Trellis".to_string(),
                    description: None,
                    issue_types: None,
                },
            )
            .await
            .unwrap();

        // Overdue by a month: matched by the storage query but outside the window
        tasks
            .create_task(
                &project.id,
                &ana.id,
                TaskCreateInput {
                    title: "Long overdue".to_string(),
                    assignee_id: Some(ana.id.clone()),
                    due_date: Some(Utc::now() - Duration::days(30)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let job = ReminderJob::new(tasks, events.clone());
        let sent = job.check_deadlines().await.unwrap();
        assert_eq!(sent, 0);
    }
}
