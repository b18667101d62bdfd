// ABOUTME: Schedule-adjustment type definitions
// ABOUTME: Adjustment kinds, approval states, workload reports, and inputs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trellis_tasks::{TaskPriority, TaskStatus};

/// Reassignment targets above this many open tasks are refused
pub const MAX_ASSIGNEE_OPEN_TASKS: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    Reassignment,
    DeadlineChange,
    PriorityChange,
    StatusChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentStatus {
    Pending,
    Approved,
    Rejected,
    Implemented,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleAdjustment {
    pub id: String,
    #[serde(rename = "type")]
    pub adjustment_type: AdjustmentType,
    pub task_id: String,
    pub project_id: String,
    pub previous_assignee_id: Option<String>,
    pub new_assignee_id: Option<String>,
    pub previous_deadline: Option<DateTime<Utc>>,
    pub new_deadline: Option<DateTime<Utc>>,
    pub previous_priority: Option<TaskPriority>,
    pub new_priority: Option<TaskPriority>,
    pub previous_status: Option<TaskStatus>,
    pub new_status: Option<TaskStatus>,
    pub requested_by_id: String,
    pub approved_by_id: Option<String>,
    pub status: AdjustmentStatus,
    pub reason: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub implemented_at: Option<DateTime<Utc>>,
}

/// Per-member workload report for a project
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadAnalysis {
    pub user_id: String,
    pub user_name: String,
    pub total_tasks: i64,
    pub high_priority_tasks: i64,
    pub overdue_tasks: i64,
    pub upcoming_deadlines: i64,
    pub workload_score: f64,
}

/// Summary used to gate reassignment targets
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWorkload {
    pub total_tasks: i64,
    pub high_priority_tasks: i64,
    pub overdue_tasks: i64,
}

#[derive(Debug, Clone)]
pub struct AdjustmentCreateInput {
    pub adjustment_type: AdjustmentType,
    pub task_id: String,
    pub new_assignee_id: Option<String>,
    pub new_deadline: Option<DateTime<Utc>>,
    pub new_priority: Option<TaskPriority>,
    pub new_status: Option<TaskStatus>,
    pub reason: String,
}
