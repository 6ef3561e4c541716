//! Subtask type: a checklist item owned by exactly one task.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{now_string, validate_title, TaskId, ValidationError};

/// Unique identifier for a subtask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubtaskId(Uuid);

impl SubtaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SubtaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubtaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: SubtaskId,
    pub task_id: TaskId,
    pub title: String,
    pub completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Subtask {
    pub fn new(task_id: TaskId, input: NewSubtask) -> Self {
        let now = now_string();
        Self {
            id: SubtaskId::new(),
            task_id,
            title: input.title.trim().to_string(),
            completed: input.completed,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Input for creating a subtask.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewSubtask {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

impl NewSubtask {
    /// An open subtask with the given title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            completed: false,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)
    }
}

/// Partial update for a subtask.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubtaskPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

impl SubtaskPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.title {
            Some(title) => validate_title(title),
            None => Ok(()),
        }
    }

    pub fn apply(&self, subtask: &mut Subtask) {
        if let Some(title) = &self.title {
            subtask.title = title.trim().to_string();
        }
        if let Some(completed) = self.completed {
            subtask.completed = completed;
        }
        subtask.updated_at = now_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_subtasks_default_to_open() {
        let input: NewSubtask = serde_json::from_str(r#"{"title": "Draft outline"}"#).unwrap();
        assert!(!input.completed);

        let subtask = Subtask::new(TaskId::new(), input);
        assert_eq!(subtask.title, "Draft outline");
        assert!(!subtask.completed);
    }

    #[test]
    fn patch_updates_only_present_fields() {
        let mut subtask = Subtask::new(TaskId::new(), NewSubtask::titled("Review"));
        let patch: SubtaskPatch = serde_json::from_str(r#"{"completed": true}"#).unwrap();
        patch.apply(&mut subtask);

        assert!(subtask.completed);
        assert_eq!(subtask.title, "Review");
    }

    #[test]
    fn patch_rejects_task_reassignment() {
        let body = format!(r#"{{"task_id": "{}"}}"#, TaskId::new());
        assert!(serde_json::from_str::<SubtaskPatch>(&body).is_err());
    }

    #[test]
    fn blank_titles_are_rejected() {
        assert_eq!(
            NewSubtask::titled(" ").validate(),
            Err(ValidationError::EmptyTitle)
        );
        let patch = SubtaskPatch {
            title: Some(String::new()),
            completed: None,
        };
        assert!(patch.validate().is_err());
    }
}
