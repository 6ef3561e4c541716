//! Task module - tasks, subtasks, and the progress rules that tie them together.
//!
//! - Entities are plain data; persistence lives in [`crate::store`]
//! - Partial updates are explicit patch structs that reject unknown fields
//! - Progress reconciliation is a pure function over a task's subtask set

mod progress;
mod subtask;
pub mod task;

pub use progress::{apply_direct_update, progress_ratio, reconcile, recompute_progress, Reconciliation};
pub use subtask::{NewSubtask, Subtask, SubtaskId, SubtaskPatch};
pub use task::{NewTask, Priority, Task, TaskFilter, TaskId, TaskPatch};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Input validation failures for tasks and subtasks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Title cannot be empty")]
    EmptyTitle,

    #[error("Invalid date {0:?}: expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid {field} {value:?}: expected HH:MM")]
    InvalidTime { field: &'static str, value: String },

    #[error("Progress must be between 0 and 100, got {0}")]
    ProgressOutOfRange(u8),

    #[error("Subtask count must be between 1 and {max}, got {requested}")]
    InvalidSubtaskCount { requested: usize, max: usize },

    #[error("Name cannot be empty")]
    EmptyName,

    #[error("Invalid email address {0:?}")]
    InvalidEmail(String),

    #[error("Password cannot be empty")]
    EmptyPassword,
}

/// A task together with its subtasks in creation order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub subtasks: Vec<Subtask>,
}

/// Get current timestamp as RFC3339 string.
pub fn now_string() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub(crate) fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        Err(ValidationError::EmptyTitle)
    } else {
        Ok(())
    }
}

pub(crate) fn validate_date(value: &str) -> Result<(), ValidationError> {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| ValidationError::InvalidDate(value.to_string()))
}

pub(crate) fn validate_time(field: &'static str, value: &str) -> Result<(), ValidationError> {
    chrono::NaiveTime::parse_from_str(value, "%H:%M")
        .map(|_| ())
        .map_err(|_| ValidationError::InvalidTime {
            field,
            value: value.to_string(),
        })
}

/// Deserialize a field that distinguishes "absent" (`None`) from an explicit
/// `null` (`Some(None)`). Use together with `#[serde(default)]`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_dates_and_times() {
        assert!(validate_date("2024-02-29").is_ok());
        assert_eq!(
            validate_date("2023-02-29"),
            Err(ValidationError::InvalidDate("2023-02-29".to_string()))
        );
        assert!(validate_date("29/02/2024").is_err());

        assert!(validate_time("start_time", "09:30").is_ok());
        assert!(validate_time("end_time", "24:10").is_err());
        assert!(validate_time("end_time", "9am").is_err());
    }

    #[test]
    fn titles_must_have_content() {
        assert!(validate_title("Buy milk").is_ok());
        assert_eq!(validate_title("   "), Err(ValidationError::EmptyTitle));
    }
}
