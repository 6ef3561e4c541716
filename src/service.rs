//! Task orchestration: ownership-checked CRUD and AI subtask generation.
//!
//! Every operation takes the calling [`AuthUser`]. A task that exists but
//! belongs to someone else is reported exactly like a missing one.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::auth::AuthUser;
use crate::planner::{GenerationRequest, SubtaskGenerator, DEFAULT_SUBTASK_COUNT};
use crate::store::{StoreError, TaskStore};
use crate::task::{
    NewSubtask, NewTask, Subtask, SubtaskId, SubtaskPatch, Task, TaskDetail, TaskFilter, TaskId,
    TaskPatch, ValidationError,
};

/// Upper bound for one generation request.
pub const MAX_GENERATED_SUBTASKS: usize = 20;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Task not found")]
    TaskNotFound,

    #[error("Subtask not found")]
    SubtaskNotFound,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct TaskService {
    store: Arc<dyn TaskStore>,
    generator: SubtaskGenerator,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>, generator: SubtaskGenerator) -> Self {
        Self { store, generator }
    }

    /// Whether subtask generation will try a model before falling back.
    pub fn generation_configured(&self) -> bool {
        self.generator.is_configured()
    }

    pub async fn list_tasks(&self, user: &AuthUser, filter: &TaskFilter) -> Result<Vec<TaskDetail>, ServiceError> {
        Ok(self.store.list_tasks(user.id, filter).await?)
    }

    pub async fn get_task(&self, user: &AuthUser, id: TaskId) -> Result<TaskDetail, ServiceError> {
        self.owned_task(user, id).await
    }

    pub async fn create_task(&self, user: &AuthUser, input: NewTask) -> Result<TaskDetail, ServiceError> {
        input.validate()?;
        let detail = self.store.create_task(Task::new(user.id, input)).await?;
        debug!(task_id = %detail.task.id, user_id = %user.id, "Created task");
        Ok(detail)
    }

    pub async fn update_task(&self, user: &AuthUser, id: TaskId, patch: TaskPatch) -> Result<TaskDetail, ServiceError> {
        patch.validate()?;
        self.owned_task(user, id).await?;
        self.store
            .update_task(id, &patch)
            .await?
            .ok_or(ServiceError::TaskNotFound)
    }

    pub async fn delete_task(&self, user: &AuthUser, id: TaskId) -> Result<(), ServiceError> {
        self.owned_task(user, id).await?;
        if self.store.delete_task(id).await? {
            debug!(task_id = %id, "Deleted task");
            Ok(())
        } else {
            Err(ServiceError::TaskNotFound)
        }
    }

    pub async fn create_subtask(
        &self,
        user: &AuthUser,
        task_id: TaskId,
        input: NewSubtask,
    ) -> Result<Subtask, ServiceError> {
        input.validate()?;
        self.owned_task(user, task_id).await?;
        self.store
            .create_subtask(Subtask::new(task_id, input))
            .await?
            .ok_or(ServiceError::TaskNotFound)
    }

    pub async fn update_subtask(
        &self,
        user: &AuthUser,
        id: SubtaskId,
        patch: SubtaskPatch,
    ) -> Result<Subtask, ServiceError> {
        patch.validate()?;
        self.owned_subtask(user, id).await?;
        self.store
            .update_subtask(id, &patch)
            .await?
            .ok_or(ServiceError::SubtaskNotFound)
    }

    pub async fn delete_subtask(&self, user: &AuthUser, id: SubtaskId) -> Result<(), ServiceError> {
        self.owned_subtask(user, id).await?;
        if self.store.delete_subtask(id).await? {
            Ok(())
        } else {
            Err(ServiceError::SubtaskNotFound)
        }
    }

    /// Generate subtask titles for a task and persist them in order.
    ///
    /// `count` defaults to five and must be within `1..=20`. Each title goes
    /// through the normal subtask creation path, so the task is reconciled
    /// after every insert. The first persistence failure aborts the rest.
    pub async fn generate_and_persist_subtasks(
        &self,
        user: &AuthUser,
        task_id: TaskId,
        count: Option<usize>,
    ) -> Result<Vec<Subtask>, ServiceError> {
        let count = count.unwrap_or(DEFAULT_SUBTASK_COUNT);
        if !(1..=MAX_GENERATED_SUBTASKS).contains(&count) {
            return Err(ValidationError::InvalidSubtaskCount {
                requested: count,
                max: MAX_GENERATED_SUBTASKS,
            }
            .into());
        }

        let task = self.owned_task(user, task_id).await?.task;
        let request = GenerationRequest::new(task.title.as_str())
            .with_description(task.notes.clone().unwrap_or_default())
            .with_category(task.category_or_default())
            .with_priority(task.priority.as_str())
            .with_count(count);

        let outcome = self.generator.generate_with_outcome(&request).await;
        info!(
            task_id = %task_id,
            count = outcome.titles.len(),
            fallback = outcome.is_fallback(),
            "Generated subtasks"
        );

        let mut created = Vec::with_capacity(outcome.titles.len());
        for title in outcome.titles {
            let subtask = self
                .store
                .create_subtask(Subtask::new(task_id, NewSubtask::titled(title)))
                .await?
                .ok_or(ServiceError::TaskNotFound)?;
            created.push(subtask);
        }
        Ok(created)
    }

    async fn owned_task(&self, user: &AuthUser, id: TaskId) -> Result<TaskDetail, ServiceError> {
        match self.store.get_task(id).await? {
            Some(detail) if detail.task.user_id == user.id => Ok(detail),
            _ => Err(ServiceError::TaskNotFound),
        }
    }

    async fn owned_subtask(&self, user: &AuthUser, id: SubtaskId) -> Result<Subtask, ServiceError> {
        let subtask = self
            .store
            .get_subtask(id)
            .await?
            .ok_or(ServiceError::SubtaskNotFound)?;
        match self.owned_task(user, subtask.task_id).await {
            Ok(_) => Ok(subtask),
            Err(ServiceError::TaskNotFound) => Err(ServiceError::SubtaskNotFound),
            Err(e) => Err(e),
        }
    }
}
