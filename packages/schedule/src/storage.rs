// ABOUTME: Schedule-adjustment storage layer using SQLite
// ABOUTME: Persists adjustment requests and their approval outcomes

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use trellis_storage::StorageError;

use crate::types::{AdjustmentStatus, ScheduleAdjustment};

pub struct AdjustmentStorage {
    pool: SqlitePool,
}

/// Everything needed to persist a new pending adjustment, previous values
/// already snapshotted by the service.
pub struct AdjustmentRecord {
    pub adjustment_type: crate::types::AdjustmentType,
    pub task_id: String,
    pub project_id: String,
    pub previous_assignee_id: Option<String>,
    pub new_assignee_id: Option<String>,
    pub previous_deadline: Option<DateTime<Utc>>,
    pub new_deadline: Option<DateTime<Utc>>,
    pub previous_priority: Option<trellis_tasks::TaskPriority>,
    pub new_priority: Option<trellis_tasks::TaskPriority>,
    pub previous_status: Option<trellis_tasks::TaskStatus>,
    pub new_status: Option<trellis_tasks::TaskStatus>,
    pub requested_by_id: String,
    pub reason: String,
}

impl AdjustmentStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_adjustment(
        &self,
        record: AdjustmentRecord,
    ) -> Result<ScheduleAdjustment, StorageError> {
        let adjustment_id = trellis_core::generate_id();
        let now = Utc::now();

        debug!(
            "Creating {:?} adjustment for task {}",
            record.adjustment_type, record.task_id
        );

        sqlx::query(
            r#"
            INSERT INTO schedule_adjustments (
                id, type, task_id, project_id,
                previous_assignee_id, new_assignee_id,
                previous_deadline, new_deadline,
                previous_priority, new_priority,
                previous_status, new_status,
                requested_by_id, status, reason, requested_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&adjustment_id)
        .bind(record.adjustment_type)
        .bind(&record.task_id)
        .bind(&record.project_id)
        .bind(&record.previous_assignee_id)
        .bind(&record.new_assignee_id)
        .bind(record.previous_deadline)
        .bind(record.new_deadline)
        .bind(record.previous_priority)
        .bind(record.new_priority)
        .bind(record.previous_status)
        .bind(record.new_status)
        .bind(&record.requested_by_id)
        .bind(AdjustmentStatus::Pending)
        .bind(&record.reason)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        self.get_adjustment(&adjustment_id)
            .await?
            .ok_or(StorageError::NotFound)
    }

    pub async fn get_adjustment(
        &self,
        adjustment_id: &str,
    ) -> Result<Option<ScheduleAdjustment>, StorageError> {
        let row = sqlx::query("SELECT * FROM schedule_adjustments WHERE id = ?")
            .bind(adjustment_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        row.as_ref().map(row_to_adjustment).transpose()
    }

    pub async fn list_for_project(
        &self,
        project_id: &str,
    ) -> Result<Vec<ScheduleAdjustment>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM schedule_adjustments
            WHERE project_id = ?
            ORDER BY requested_at DESC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.iter().map(row_to_adjustment).collect()
    }

    pub async fn mark_approved(
        &self,
        adjustment_id: &str,
        approved_by_id: &str,
        implemented_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            UPDATE schedule_adjustments
            SET status = ?, approved_by_id = ?, implemented_at = ?
            WHERE id = ?
            "#,
        )
        .bind(AdjustmentStatus::Approved)
        .bind(approved_by_id)
        .bind(implemented_at)
        .bind(adjustment_id)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        Ok(())
    }

    pub async fn mark_rejected(
        &self,
        adjustment_id: &str,
        reason: &str,
    ) -> Result<(), StorageError> {
        sqlx::query("UPDATE schedule_adjustments SET status = ?, reason = ? WHERE id = ?")
            .bind(AdjustmentStatus::Rejected)
            .bind(reason)
            .bind(adjustment_id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        Ok(())
    }
}

fn row_to_adjustment(row: &sqlx::sqlite::SqliteRow) -> Result<ScheduleAdjustment, StorageError> {
    Ok(ScheduleAdjustment {
        id: row.try_get("id")?,
        adjustment_type: row.try_get("type")?,
        task_id: row.try_get("task_id")?,
        project_id: row.try_get("project_id")?,
        previous_assignee_id: row.try_get("previous_assignee_id")?,
        new_assignee_id: row.try_get("new_assignee_id")?,
        previous_deadline: row.try_get("previous_deadline")?,
        new_deadline: row.try_get("new_deadline")?,
        previous_priority: row.try_get("previous_priority")?,
        new_priority: row.try_get("new_priority")?,
        previous_status: row.try_get("previous_status")?,
        new_status: row.try_get("new_status")?,
        requested_by_id: row.try_get("requested_by_id")?,
        approved_by_id: row.try_get("approved_by_id")?,
        status: row.try_get("status")?,
        reason: row.try_get("reason")?,
        requested_at: row.try_get("requested_at")?,
        implemented_at: row.try_get("implemented_at")?,
    })
}
