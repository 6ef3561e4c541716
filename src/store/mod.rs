//! Task storage module with pluggable backends.
//!
//! Supports:
//! - `memory`: In-memory storage (non-persistent, for testing)
//! - `sqlite`: SQLite database file
//!
//! Every subtask mutation reconciles the owning task's progress and
//! completion flag inside the same critical section as the mutation itself.

mod memory;
mod sqlite;

pub use memory::InMemoryTaskStore;
pub use sqlite::SqliteTaskStore;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::task::{Subtask, SubtaskId, SubtaskPatch, Task, TaskDetail, TaskFilter, TaskId, TaskPatch};
use crate::user::{User, UserId, UserSettings};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Task store trait - implemented by all storage backends.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Whether this store persists data across restarts.
    fn is_persistent(&self) -> bool;

    async fn get_task(&self, id: TaskId) -> Result<Option<TaskDetail>, StoreError>;

    async fn get_subtask(&self, id: SubtaskId) -> Result<Option<Subtask>, StoreError>;

    /// List a user's tasks ordered by date, start time and creation.
    async fn list_tasks(&self, user_id: UserId, filter: &TaskFilter) -> Result<Vec<TaskDetail>, StoreError>;

    async fn create_task(&self, task: Task) -> Result<TaskDetail, StoreError>;

    /// Insert a subtask and reconcile its task. `None` if the task is gone.
    async fn create_subtask(&self, subtask: Subtask) -> Result<Option<Subtask>, StoreError>;

    /// Apply a direct update (see [`crate::task::apply_direct_update`]).
    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Option<TaskDetail>, StoreError>;

    /// Patch a subtask and reconcile its task.
    async fn update_subtask(&self, id: SubtaskId, patch: &SubtaskPatch) -> Result<Option<Subtask>, StoreError>;

    /// Delete a task and its subtasks.
    async fn delete_task(&self, id: TaskId) -> Result<bool, StoreError>;

    /// Delete a subtask and reconcile its task.
    async fn delete_subtask(&self, id: SubtaskId) -> Result<bool, StoreError>;

    /// Insert a user together with default settings.
    async fn create_user(&self, user: User) -> Result<User, StoreError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Case-insensitive lookup.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Replace a user's name, email and password hash.
    async fn update_user(&self, user: User) -> Result<Option<User>, StoreError>;

    async fn get_user_settings(&self, id: UserId) -> Result<Option<UserSettings>, StoreError>;
}

/// Store type selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreType {
    Memory,
    #[default]
    Sqlite,
}

impl StoreType {
    /// Parse from string (case-insensitive). Unknown values select SQLite.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "memory" => Self::Memory,
            _ => Self::Sqlite,
        }
    }
}

/// Create a task store based on type.
pub async fn create_task_store(
    store_type: StoreType,
    database_path: &Path,
) -> Result<Arc<dyn TaskStore>, StoreError> {
    match store_type {
        StoreType::Memory => Ok(Arc::new(InMemoryTaskStore::new())),
        StoreType::Sqlite => {
            let store = SqliteTaskStore::open(database_path.to_path_buf()).await?;
            Ok(Arc::new(store))
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_type_parsing() {
        assert_eq!(StoreType::from_str("memory"), StoreType::Memory);
        assert_eq!(StoreType::from_str(" MEMORY "), StoreType::Memory);
        assert_eq!(StoreType::from_str("sqlite"), StoreType::Sqlite);
        assert_eq!(StoreType::from_str("postgres"), StoreType::Sqlite);
        assert_eq!(StoreType::default(), StoreType::Sqlite);
    }

    #[tokio::test]
    async fn memory_factory_is_not_persistent() {
        let store = create_task_store(StoreType::Memory, Path::new("unused.db"))
            .await
            .expect("Failed to create store");
        assert!(!store.is_persistent());
    }
}
