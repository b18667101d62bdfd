// ABOUTME: Schedule-adjustment service
// ABOUTME: Workload scoring, optimal reassignment, and the admin approval workflow

use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

use trellis_events::{AppEvent, EventBus};
use trellis_projects::{Project, ProjectStorage};
use trellis_storage::StorageError;
use trellis_tasks::{Task, TaskStorage, TaskUpdateInput};
use trellis_users::{User, UserStorage};

use crate::storage::{AdjustmentRecord, AdjustmentStorage};
use crate::types::{
    AdjustmentCreateInput, AdjustmentStatus, AdjustmentType, ScheduleAdjustment, UserWorkload,
    WorkloadAnalysis, MAX_ASSIGNEE_OPEN_TASKS,
};

/// Deadlines this many days out count as "upcoming" in workload scoring
const UPCOMING_WINDOW_DAYS: i64 = 7;

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Task not found")]
    TaskNotFound,
    #[error("Project not found")]
    ProjectNotFound,
    #[error("Adjustment request not found")]
    AdjustmentNotFound,
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    InvalidRequest(String),
}

pub struct ScheduleManager {
    adjustments: AdjustmentStorage,
    tasks: TaskStorage,
    projects: ProjectStorage,
    users: UserStorage,
    events: EventBus,
}

impl ScheduleManager {
    pub fn new(pool: SqlitePool, events: EventBus) -> Self {
        Self {
            adjustments: AdjustmentStorage::new(pool.clone()),
            tasks: TaskStorage::new(pool.clone()),
            projects: ProjectStorage::new(pool.clone()),
            users: UserStorage::new(pool),
            events,
        }
    }

    async fn require_project_access(
        &self,
        project_id: &str,
        user: &User,
    ) -> Result<Project, ScheduleError> {
        let project = self
            .projects
            .get_project(project_id)
            .await?
            .ok_or(ScheduleError::ProjectNotFound)?;

        if !project.is_user_admin(&user.id) && !self.projects.is_member(project_id, &user.id).await?
        {
            return Err(ScheduleError::Forbidden(
                "You do not have access to this project",
            ));
        }

        Ok(project)
    }

    /// Score every active member of the project by open-task load,
    /// heaviest first.
    pub async fn analyze_team_workload(
        &self,
        project_id: &str,
        requester: &User,
    ) -> Result<Vec<WorkloadAnalysis>, ScheduleError> {
        self.require_project_access(project_id, requester).await?;

        let tasks = self.tasks.list_open_tasks_for_project(project_id).await?;
        let members = self.projects.list_members(project_id).await?;

        let now = Utc::now();
        let upcoming_cutoff = now + Duration::days(UPCOMING_WINDOW_DAYS);

        let mut analysis: Vec<WorkloadAnalysis> = Vec::new();

        for member in &members {
            let member_tasks: Vec<&Task> = tasks
                .iter()
                .filter(|t| t.assignee_id.as_deref() == Some(member.user_id.as_str()))
                .collect();

            let total_tasks = member_tasks.len() as i64;
            let high_priority_tasks = member_tasks
                .iter()
                .filter(|t| t.priority.map(|p| p.is_high()).unwrap_or(false))
                .count() as i64;
            let overdue_tasks = member_tasks
                .iter()
                .filter(|t| t.due_date.map(|d| d < now).unwrap_or(false))
                .count() as i64;
            let upcoming_deadlines = member_tasks
                .iter()
                .filter(|t| {
                    t.due_date
                        .map(|d| d >= now && d <= upcoming_cutoff)
                        .unwrap_or(false)
                })
                .count() as i64;

            let workload_score = total_tasks as f64 * 0.3
                + high_priority_tasks as f64 * 0.4
                + overdue_tasks as f64 * 0.5
                + upcoming_deadlines as f64 * 0.2;

            let user_name = member
                .user
                .as_ref()
                .map(|u| u.name.clone())
                .unwrap_or_else(|| member.user_id.clone());

            analysis.push(WorkloadAnalysis {
                user_id: member.user_id.clone(),
                user_name,
                total_tasks,
                high_priority_tasks,
                overdue_tasks,
                upcoming_deadlines,
                workload_score: (workload_score * 100.0).round() / 100.0,
            });
        }

        analysis.sort_by(|a, b| {
            b.workload_score
                .partial_cmp(&a.workload_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(analysis)
    }

    /// Least-loaded members, excluding the current assignee; top three
    /// candidates returned as full user records.
    pub async fn find_optimal_reassignment(
        &self,
        task_id: &str,
        requester: &User,
    ) -> Result<Vec<User>, ScheduleError> {
        let task = self
            .tasks
            .get_task(task_id)
            .await?
            .ok_or(ScheduleError::TaskNotFound)?;

        let project = self
            .projects
            .get_project(&task.project_id)
            .await?
            .ok_or(ScheduleError::ProjectNotFound)?;

        if !project.is_user_admin(&requester.id) {
            return Err(ScheduleError::Forbidden(
                "Only project admins can find optimal reassignments",
            ));
        }

        let mut analysis = self.analyze_team_workload(&task.project_id, requester).await?;

        analysis.retain(|a| task.assignee_id.as_deref() != Some(a.user_id.as_str()));
        analysis.sort_by(|a, b| {
            a.workload_score
                .partial_cmp(&b.workload_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut candidates = Vec::new();
        for entry in analysis.iter().take(3) {
            candidates.push(self.users.get_user(&entry.user_id).await?);
        }

        Ok(candidates)
    }

    /// Open-task summary used to gate reassignment targets
    pub async fn get_user_workload(&self, user_id: &str) -> Result<UserWorkload, ScheduleError> {
        let tasks = self.tasks.list_open_tasks_for_assignee(user_id).await?;
        let now = Utc::now();

        Ok(UserWorkload {
            total_tasks: tasks.len() as i64,
            high_priority_tasks: tasks
                .iter()
                .filter(|t| t.priority.map(|p| p.is_high()).unwrap_or(false))
                .count() as i64,
            overdue_tasks: tasks
                .iter()
                .filter(|t| t.due_date.map(|d| d < now).unwrap_or(false))
                .count() as i64,
        })
    }

    pub async fn request_adjustment(
        &self,
        input: AdjustmentCreateInput,
        requester: &User,
    ) -> Result<ScheduleAdjustment, ScheduleError> {
        let task = self
            .tasks
            .get_task(&input.task_id)
            .await?
            .ok_or(ScheduleError::TaskNotFound)?;

        let project = self.require_project_access(&task.project_id, requester).await?;

        // Validate based on adjustment type
        match input.adjustment_type {
            AdjustmentType::Reassignment if input.new_assignee_id.is_none() => {
                return Err(ScheduleError::InvalidRequest(
                    "New assignee ID is required for reassignment".to_string(),
                ));
            }
            AdjustmentType::DeadlineChange if input.new_deadline.is_none() => {
                return Err(ScheduleError::InvalidRequest(
                    "New deadline is required for deadline change".to_string(),
                ));
            }
            AdjustmentType::PriorityChange if input.new_priority.is_none() => {
                return Err(ScheduleError::InvalidRequest(
                    "New priority is required for priority change".to_string(),
                ));
            }
            AdjustmentType::StatusChange if input.new_status.is_none() => {
                return Err(ScheduleError::InvalidRequest(
                    "New status is required for status change".to_string(),
                ));
            }
            _ => {}
        }

        if input.adjustment_type == AdjustmentType::Reassignment {
            if let Some(new_assignee_id) = &input.new_assignee_id {
                if !self.projects.is_member(&task.project_id, new_assignee_id).await? {
                    return Err(ScheduleError::InvalidRequest(
                        "New assignee must be a project member".to_string(),
                    ));
                }

                let workload = self.get_user_workload(new_assignee_id).await?;
                if workload.total_tasks >= MAX_ASSIGNEE_OPEN_TASKS {
                    return Err(ScheduleError::InvalidRequest(
                        "New assignee has too many tasks already".to_string(),
                    ));
                }
            }
        }

        let adjustment = self
            .adjustments
            .create_adjustment(AdjustmentRecord {
                adjustment_type: input.adjustment_type,
                task_id: task.id.clone(),
                project_id: task.project_id.clone(),
                previous_assignee_id: task.assignee_id.clone(),
                new_assignee_id: input.new_assignee_id,
                previous_deadline: task.due_date,
                new_deadline: input.new_deadline,
                previous_priority: task.priority,
                new_priority: input.new_priority,
                previous_status: Some(task.status),
                new_status: input.new_status,
                requested_by_id: requester.id.clone(),
                reason: input.reason,
            })
            .await?;

        info!(
            "Adjustment {} requested for task {} by {}",
            adjustment.id, task.id, requester.id
        );

        self.events.publish(AppEvent::AdjustmentRequested {
            recipient_id: project.admin_id.clone(),
            project_id: project.id.clone(),
            task_id: task.id.clone(),
            task_title: task.title.clone(),
        });

        Ok(adjustment)
    }

    pub async fn approve_adjustment(
        &self,
        adjustment_id: &str,
        approver: &User,
    ) -> Result<ScheduleAdjustment, ScheduleError> {
        let adjustment = self
            .adjustments
            .get_adjustment(adjustment_id)
            .await?
            .ok_or(ScheduleError::AdjustmentNotFound)?;

        let (task, project) = self.load_adjustment_context(&adjustment).await?;

        if !project.is_user_admin(&approver.id) {
            return Err(ScheduleError::Forbidden(
                "Only project admins can approve adjustments",
            ));
        }

        if adjustment.status != AdjustmentStatus::Pending {
            return Err(ScheduleError::InvalidRequest(
                "Adjustment is not in pending status".to_string(),
            ));
        }

        // Implement the adjustment on the task
        let mut update = TaskUpdateInput::default();
        match adjustment.adjustment_type {
            AdjustmentType::Reassignment => update.assignee_id = adjustment.new_assignee_id.clone(),
            AdjustmentType::DeadlineChange => update.due_date = adjustment.new_deadline,
            AdjustmentType::PriorityChange => update.priority = adjustment.new_priority,
            AdjustmentType::StatusChange => update.status = adjustment.new_status,
        }
        self.tasks.update_task(&task.id, update).await?;

        self.adjustments
            .mark_approved(&adjustment.id, &approver.id, Utc::now())
            .await?;

        info!("Adjustment {} approved by {}", adjustment.id, approver.id);

        self.events.publish(AppEvent::AdjustmentApproved {
            recipient_id: adjustment.requested_by_id.clone(),
            project_id: project.id.clone(),
            task_id: task.id.clone(),
            task_title: task.title.clone(),
        });

        self.adjustments
            .get_adjustment(&adjustment.id)
            .await?
            .ok_or(ScheduleError::AdjustmentNotFound)
    }

    pub async fn reject_adjustment(
        &self,
        adjustment_id: &str,
        rejecter: &User,
        reason: String,
    ) -> Result<ScheduleAdjustment, ScheduleError> {
        let adjustment = self
            .adjustments
            .get_adjustment(adjustment_id)
            .await?
            .ok_or(ScheduleError::AdjustmentNotFound)?;

        let (task, project) = self.load_adjustment_context(&adjustment).await?;

        if !project.is_user_admin(&rejecter.id) {
            return Err(ScheduleError::Forbidden(
                "Only project admins can reject adjustments",
            ));
        }

        if adjustment.status != AdjustmentStatus::Pending {
            return Err(ScheduleError::InvalidRequest(
                "Adjustment is not in pending status".to_string(),
            ));
        }

        self.adjustments.mark_rejected(&adjustment.id, &reason).await?;

        self.events.publish(AppEvent::AdjustmentRejected {
            recipient_id: adjustment.requested_by_id.clone(),
            project_id: project.id.clone(),
            task_id: task.id.clone(),
            task_title: task.title.clone(),
            reason,
        });

        self.adjustments
            .get_adjustment(&adjustment.id)
            .await?
            .ok_or(ScheduleError::AdjustmentNotFound)
    }

    pub async fn get_project_adjustments(
        &self,
        project_id: &str,
        user: &User,
    ) -> Result<Vec<ScheduleAdjustment>, ScheduleError> {
        self.require_project_access(project_id, user).await?;
        Ok(self.adjustments.list_for_project(project_id).await?)
    }

    async fn load_adjustment_context(
        &self,
        adjustment: &ScheduleAdjustment,
    ) -> Result<(Task, Project), ScheduleError> {
        let task = self
            .tasks
            .get_task(&adjustment.task_id)
            .await?
            .ok_or(ScheduleError::TaskNotFound)?;
        let project = self
            .projects
            .get_project(&adjustment.project_id)
            .await?
            .ok_or(ScheduleError::ProjectNotFound)?;
        Ok((task, project))
    }
}
