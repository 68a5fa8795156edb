//! Task domain model.
//!
//! This module contains the Task value objects that describe background
//! units of work (e.g., bulk invitations) tracked by the task registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Represents the current status of a tracked task.
///
/// Transitions are monotone: `Running` moves to exactly one of the terminal
/// states and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// The task is queued or currently being executed by a worker.
    Running,
    /// The task returned successfully.
    Completed,
    /// The task returned an error or panicked.
    Failed,
    /// The task was cancelled before a worker picked it up.
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::Running)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A snapshot of one tracked task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInfo {
    /// Caller-chosen identifier, unique among tracked tasks.
    pub id: String,
    /// The status at the time of the snapshot.
    pub status: TaskStatus,
    /// When the task was submitted.
    pub created_at: DateTime<Utc>,
    /// The failure message, for failed tasks.
    pub error: Option<String>,
}

/// Generates a unique task identifier with a readable prefix, e.g. `invite-3f2a…`.
pub fn generate_task_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = generate_task_id("invite");
        let b = generate_task_id("invite");
        assert!(a.starts_with("invite-"));
        assert_ne!(a, b);
    }
}
