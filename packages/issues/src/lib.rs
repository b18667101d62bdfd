// ABOUTME: Issue tracking for Trellis projects
// ABOUTME: Entity types, storage layer, and the membership-gated issue service

pub mod manager;
pub mod storage;
pub mod types;

pub use manager::{IssueError, IssuesManager};
pub use storage::IssueStorage;
pub use types::{Issue, IssueCreateInput, IssuePriority, IssueStatus, IssueUpdateInput};
