//! Task domain module.
//!
//! This module contains the task-related domain models shared by the
//! background task registry and its callers.
//!
//! # Module Structure
//!
//! - `model`: Core task domain models (`TaskStatus`, `TaskInfo`)
//!
//! # Usage
//!
//! ```ignore
//! use formdesk_core::task::{TaskStatus, TaskInfo};
//! ```

mod model;

// Re-export public API
pub use model::{TaskInfo, TaskStatus, generate_task_id};
