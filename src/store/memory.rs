//! In-memory task store (non-persistent).

use super::{StoreError, TaskStore};
use crate::task::{
    apply_direct_update, Subtask, SubtaskId, SubtaskPatch, Task, TaskDetail, TaskFilter, TaskId,
    TaskPatch,
};
use crate::user::{normalize_email, User, UserId, UserSettings};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    users: HashMap<UserId, User>,
    settings: HashMap<UserId, UserSettings>,
    tasks: HashMap<TaskId, Task>,
    /// Subtasks per task, in creation order.
    subtasks: HashMap<TaskId, Vec<Subtask>>,
    subtask_owner: HashMap<SubtaskId, TaskId>,
}

impl State {
    fn detail(&self, id: TaskId) -> Option<TaskDetail> {
        self.tasks.get(&id).map(|task| TaskDetail {
            task: task.clone(),
            subtasks: self.subtasks.get(&id).cloned().unwrap_or_default(),
        })
    }

    fn reconcile(&mut self, task_id: TaskId) {
        let subtasks = self.subtasks.get(&task_id).map(Vec::as_slice).unwrap_or(&[]);
        if let Some(task) = self.tasks.get_mut(&task_id) {
            task.apply_reconciliation(subtasks);
            task.touch();
        }
    }

    fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

/// All collections sit behind one lock so a subtask change and the
/// reconciliation of its task are a single atomic step.
#[derive(Clone, Default)]
pub struct InMemoryTaskStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<TaskDetail>, StoreError> {
        Ok(self.state.read().await.detail(id))
    }

    async fn get_subtask(&self, id: SubtaskId) -> Result<Option<Subtask>, StoreError> {
        let state = self.state.read().await;
        let subtask = state
            .subtask_owner
            .get(&id)
            .and_then(|task_id| state.subtasks.get(task_id))
            .and_then(|subs| subs.iter().find(|s| s.id == id))
            .cloned();
        Ok(subtask)
    }

    async fn list_tasks(&self, user_id: UserId, filter: &TaskFilter) -> Result<Vec<TaskDetail>, StoreError> {
        let state = self.state.read().await;
        let mut tasks: Vec<&Task> = state
            .tasks
            .values()
            .filter(|t| t.user_id == user_id && filter.matches(t))
            .collect();
        tasks.sort_by(|a, b| {
            (&a.date, &a.start_time, &a.created_at).cmp(&(&b.date, &b.start_time, &b.created_at))
        });
        Ok(tasks
            .into_iter()
            .skip(filter.skip)
            .take(filter.limit)
            .filter_map(|t| state.detail(t.id))
            .collect())
    }

    async fn create_task(&self, task: Task) -> Result<TaskDetail, StoreError> {
        let mut state = self.state.write().await;
        let id = task.id;
        state.tasks.insert(id, task);
        state.subtasks.insert(id, Vec::new());
        state
            .detail(id)
            .ok_or_else(|| StoreError::Corrupt(format!("task {} vanished after insert", id)))
    }

    async fn create_subtask(&self, subtask: Subtask) -> Result<Option<Subtask>, StoreError> {
        let mut state = self.state.write().await;
        let task_id = subtask.task_id;
        if !state.tasks.contains_key(&task_id) {
            return Ok(None);
        }
        state.subtask_owner.insert(subtask.id, task_id);
        state.subtasks.entry(task_id).or_default().push(subtask.clone());
        state.reconcile(task_id);
        Ok(Some(subtask))
    }

    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Option<TaskDetail>, StoreError> {
        let mut state = self.state.write().await;
        let State { tasks, subtasks, .. } = &mut *state;
        let Some(task) = tasks.get_mut(&id) else {
            return Ok(None);
        };
        let subs = subtasks.get(&id).map(Vec::as_slice).unwrap_or(&[]);
        apply_direct_update(task, patch, subs);
        Ok(state.detail(id))
    }

    async fn update_subtask(&self, id: SubtaskId, patch: &SubtaskPatch) -> Result<Option<Subtask>, StoreError> {
        let mut state = self.state.write().await;
        let Some(&task_id) = state.subtask_owner.get(&id) else {
            return Ok(None);
        };
        let updated = state
            .subtasks
            .get_mut(&task_id)
            .and_then(|subs| subs.iter_mut().find(|s| s.id == id))
            .map(|subtask| {
                patch.apply(subtask);
                subtask.clone()
            });
        if updated.is_some() {
            state.reconcile(task_id);
        }
        Ok(updated)
    }

    async fn delete_task(&self, id: TaskId) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        if state.tasks.remove(&id).is_none() {
            return Ok(false);
        }
        if let Some(subs) = state.subtasks.remove(&id) {
            for subtask in subs {
                state.subtask_owner.remove(&subtask.id);
            }
        }
        Ok(true)
    }

    async fn delete_subtask(&self, id: SubtaskId) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let Some(task_id) = state.subtask_owner.remove(&id) else {
            return Ok(false);
        };
        if let Some(subs) = state.subtasks.get_mut(&task_id) {
            subs.retain(|s| s.id != id);
        }
        state.reconcile(task_id);
        Ok(true)
    }

    async fn create_user(&self, user: User) -> Result<User, StoreError> {
        let mut state = self.state.write().await;
        if state.email_taken(&user.email, None) {
            return Err(StoreError::DuplicateEmail);
        }
        state.settings.insert(user.id, UserSettings::default());
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = normalize_email(email);
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, mut user: User) -> Result<Option<User>, StoreError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user.id) {
            return Ok(None);
        }
        user.email = normalize_email(&user.email);
        if state.email_taken(&user.email, Some(user.id)) {
            return Err(StoreError::DuplicateEmail);
        }
        user.updated_at = crate::task::now_string();
        state.users.insert(user.id, user.clone());
        Ok(Some(user))
    }

    async fn get_user_settings(&self, id: UserId) -> Result<Option<UserSettings>, StoreError> {
        Ok(self.state.read().await.settings.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract;

    #[tokio::test]
    async fn test_subtask_changes_reconcile_task() {
        contract::subtask_changes_reconcile_task(&InMemoryTaskStore::new()).await;
    }

    #[tokio::test]
    async fn test_direct_update_recomputes_progress() {
        contract::direct_update_recomputes_progress(&InMemoryTaskStore::new()).await;
    }

    #[tokio::test]
    async fn test_direct_update_follows_subtask_completion() {
        contract::direct_update_follows_subtask_completion(&InMemoryTaskStore::new()).await;
    }

    #[tokio::test]
    async fn test_deleting_task_cascades() {
        contract::deleting_task_cascades(&InMemoryTaskStore::new()).await;
    }

    #[tokio::test]
    async fn test_list_filters_and_pages() {
        contract::list_filters_and_pages(&InMemoryTaskStore::new()).await;
    }

    #[tokio::test]
    async fn test_users_and_settings() {
        contract::users_and_settings(&InMemoryTaskStore::new()).await;
    }
}
