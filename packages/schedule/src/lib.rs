// ABOUTME: Workload analysis and the schedule-adjustment workflow
// ABOUTME: Entity types, storage layer, and the approval-gated adjustment service

pub mod manager;
pub mod storage;
pub mod types;

pub use manager::{ScheduleError, ScheduleManager};
pub use storage::AdjustmentStorage;
pub use types::{
    AdjustmentCreateInput, AdjustmentStatus, AdjustmentType, ScheduleAdjustment, UserWorkload,
    WorkloadAnalysis,
};
