//! Core Task type, creation input, and partial-update patch.
//!
//! # Invariants
//! - `progress <= 100`
//! - when the task has subtasks, `progress` and `completed` follow
//!   [`super::reconcile`] after every subtask change

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{double_option, now_string, validate_date, validate_time, validate_title, ValidationError};
use crate::user::UserId;

/// Unique identifier for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Create a new unique task ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Parse a stored value; unknown values map to `Medium`.
    pub fn parse(value: &str) -> Self {
        match value {
            "low" => Priority::Low,
            "high" => Priority::High,
            _ => Priority::Medium,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub user_id: UserId,
    pub title: String,
    pub notes: Option<String>,
    /// Calendar day, `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub start_time: Option<String>,
    /// `HH:MM`
    pub end_time: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub is_all_day: bool,
    pub is_anytime: bool,
    pub repeat: Option<String>,
    pub completed: bool,
    pub category: Option<String>,
    pub priority: Priority,
    /// Percentage of completed subtasks, 0-100
    pub progress: u8,
    pub due_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Task {
    /// Create a task from validated input.
    pub fn new(user_id: UserId, input: NewTask) -> Self {
        let now = now_string();
        Self {
            id: TaskId::new(),
            user_id,
            title: input.title.trim().to_string(),
            notes: input.notes,
            date: input.date,
            start_time: input.start_time,
            end_time: input.end_time,
            color: input.color,
            icon: input.icon,
            is_all_day: input.is_all_day,
            is_anytime: input.is_anytime,
            repeat: input.repeat,
            completed: input.completed,
            category: input.category,
            priority: input.priority,
            progress: 0,
            due_date: input.due_date,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Category used for subtask generation.
    pub fn category_or_default(&self) -> &str {
        self.category
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or("Task")
    }

    pub fn touch(&mut self) {
        self.updated_at = now_string();
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub date: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub is_all_day: bool,
    #[serde(default)]
    pub is_anytime: bool,
    #[serde(default)]
    pub repeat: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            date: date.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;
        validate_date(&self.date)?;
        if let Some(due) = &self.due_date {
            validate_date(due)?;
        }
        if let Some(start) = &self.start_time {
            validate_time("start_time", start)?;
        }
        if let Some(end) = &self.end_time {
            validate_time("end_time", end)?;
        }
        Ok(())
    }
}

/// Partial update for a task.
///
/// Absent fields are left alone. Nullable fields use `Option<Option<_>>`:
/// `Some(None)` (JSON `null`) clears the value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaskPatch {
    pub title: Option<String>,
    #[serde(deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    pub date: Option<String>,
    #[serde(deserialize_with = "double_option")]
    pub start_time: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub end_time: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub color: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub icon: Option<Option<String>>,
    pub is_all_day: Option<bool>,
    pub is_anytime: Option<bool>,
    #[serde(deserialize_with = "double_option")]
    pub repeat: Option<Option<String>>,
    pub completed: Option<bool>,
    #[serde(deserialize_with = "double_option")]
    pub category: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub progress: Option<u8>,
    #[serde(deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,
}

impl TaskPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(date) = &self.date {
            validate_date(date)?;
        }
        if let Some(Some(due)) = &self.due_date {
            validate_date(due)?;
        }
        if let Some(Some(start)) = &self.start_time {
            validate_time("start_time", start)?;
        }
        if let Some(Some(end)) = &self.end_time {
            validate_time("end_time", end)?;
        }
        if let Some(progress) = self.progress {
            if progress > 100 {
                return Err(ValidationError::ProgressOutOfRange(progress));
            }
        }
        Ok(())
    }

    /// Copy every present field onto `task`.
    pub fn apply(&self, task: &mut Task) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *target = v.clone();
            }
        }

        if let Some(title) = &self.title {
            task.title = title.trim().to_string();
        }
        set(&mut task.notes, &self.notes);
        set(&mut task.date, &self.date);
        set(&mut task.start_time, &self.start_time);
        set(&mut task.end_time, &self.end_time);
        set(&mut task.color, &self.color);
        set(&mut task.icon, &self.icon);
        set(&mut task.is_all_day, &self.is_all_day);
        set(&mut task.is_anytime, &self.is_anytime);
        set(&mut task.repeat, &self.repeat);
        set(&mut task.completed, &self.completed);
        set(&mut task.category, &self.category);
        set(&mut task.priority, &self.priority);
        set(&mut task.progress, &self.progress);
        set(&mut task.due_date, &self.due_date);
        task.touch();
    }
}

/// Filters for listing a user's tasks.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TaskFilter {
    pub skip: usize,
    pub limit: usize,
    pub date: Option<String>,
    pub completed: Option<bool>,
}

impl Default for TaskFilter {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 100,
            date: None,
            completed: None,
        }
    }
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        self.date.as_deref().map_or(true, |d| task.date == d)
            && self.completed.map_or(true, |c| task.completed == c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> Task {
        let mut input = NewTask::new("  Write blog post ", "2024-05-01");
        input.notes = Some("about Rust".to_string());
        input.category = Some("Document".to_string());
        Task::new(UserId::new(), input)
    }

    #[test]
    fn new_task_starts_at_zero_progress() {
        let task = sample_task();
        assert_eq!(task.title, "Write blog post");
        assert_eq!(task.progress, 0);
        assert!(!task.completed);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.category_or_default(), "Document");
    }

    #[test]
    fn category_defaults_to_task() {
        let mut task = sample_task();
        task.category = None;
        assert_eq!(task.category_or_default(), "Task");
        task.category = Some(" ".to_string());
        assert_eq!(task.category_or_default(), "Task");
    }

    #[test]
    fn new_task_validation() {
        assert!(NewTask::new("ok", "2024-01-01").validate().is_ok());
        assert_eq!(
            NewTask::new("", "2024-01-01").validate(),
            Err(ValidationError::EmptyTitle)
        );
        let mut input = NewTask::new("ok", "2024-01-01");
        input.start_time = Some("25:00".to_string());
        assert!(matches!(
            input.validate(),
            Err(ValidationError::InvalidTime { field: "start_time", .. })
        ));
    }

    #[test]
    fn patch_distinguishes_absent_from_null() {
        let patch: TaskPatch =
            serde_json::from_str(r#"{"notes": null, "priority": "high"}"#).unwrap();
        assert_eq!(patch.notes, Some(None));
        assert_eq!(patch.color, None);

        let mut task = sample_task();
        task.color = Some("#ff0000".to_string());
        patch.apply(&mut task);

        assert_eq!(task.notes, None);
        assert_eq!(task.color.as_deref(), Some("#ff0000"));
        assert_eq!(task.priority, Priority::High);
    }

    #[test]
    fn patch_rejects_unknown_fields() {
        let result = serde_json::from_str::<TaskPatch>(r#"{"user_id": "someone-else"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn patch_validates_progress_range() {
        let patch = TaskPatch {
            progress: Some(101),
            ..TaskPatch::default()
        };
        assert_eq!(patch.validate(), Err(ValidationError::ProgressOutOfRange(101)));
    }

    #[test]
    fn filter_matches_date_and_completion() {
        let task = sample_task();
        assert!(TaskFilter::default().matches(&task));

        let by_date = TaskFilter {
            date: Some("2024-05-01".to_string()),
            ..TaskFilter::default()
        };
        assert!(by_date.matches(&task));

        let done_only = TaskFilter {
            completed: Some(true),
            ..TaskFilter::default()
        };
        assert!(!done_only.matches(&task));
    }

    #[test]
    fn priority_round_trips_through_storage_strings() {
        for p in [Priority::Low, Priority::Medium, Priority::High] {
            assert_eq!(Priority::parse(p.as_str()), p);
        }
        assert_eq!(Priority::parse("urgent"), Priority::Medium);
    }
}
