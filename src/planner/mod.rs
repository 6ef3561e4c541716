//! Subtask planning: turn a task's metadata into a list of subtask titles.
//!
//! [`SubtaskGenerator`] asks a language model first and falls back to a fixed
//! per-category list ([`fallback_subtasks`]) when no model is configured or
//! every attempt fails. Callers always get a non-empty list.

mod fallback;
mod generator;
mod prompt;

pub use fallback::fallback_subtasks;
pub use generator::{FallbackReason, GenerationOutcome, GenerationSource, SubtaskGenerator};
pub use prompt::{build_prompt, parse_subtask_lines, NO_DESCRIPTION, SYSTEM_PROMPT};

/// Default number of subtasks requested from the model.
pub const DEFAULT_SUBTASK_COUNT: usize = 5;

/// Input to subtask generation. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: String,
    pub count: usize,
}

impl GenerationRequest {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            category: "Task".to_string(),
            priority: "medium".to_string(),
            count: DEFAULT_SUBTASK_COUNT,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = priority.into();
        self
    }

    /// Requested number of titles. Zero is raised to one.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count.max(1);
        self
    }
}
