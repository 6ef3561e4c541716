//! Progress reconciliation between a task and its subtasks.
//!
//! # Rules
//! - no subtasks: progress is 0 and `completed` is left as is
//! - otherwise progress is `floor(100 * done / total)`
//! - all subtasks done forces `completed = true`, any open subtask forces
//!   `completed = false`
//! - a direct task update that leaves `progress` out is reconciled the same
//!   way; one that sets `progress` is stored as given
//!
//! Reconciling is idempotent: applying it twice to the same subtask set gives
//! the same task state.

use super::{Subtask, Task, TaskPatch};

/// Derived task state for a given subtask set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    pub progress: u8,
    pub completed: bool,
}

/// Integer percentage of `done` over `total`, rounded down. Zero when empty.
pub fn progress_ratio(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let done = done.min(total);
    (done * 100 / total) as u8
}

/// Progress for a non-empty subtask set, `None` when there are no subtasks.
pub fn recompute_progress(subtasks: &[Subtask]) -> Option<u8> {
    if subtasks.is_empty() {
        return None;
    }
    let done = subtasks.iter().filter(|s| s.completed).count();
    Some(progress_ratio(done, subtasks.len()))
}

/// Compute the task's progress and completion flag after a subtask change.
pub fn reconcile(task_completed: bool, subtasks: &[Subtask]) -> Reconciliation {
    match recompute_progress(subtasks) {
        None => Reconciliation {
            progress: 0,
            completed: task_completed,
        },
        Some(progress) => Reconciliation {
            progress,
            completed: progress == 100,
        },
    }
}

impl Task {
    /// Reconcile against `subtasks` and write the result onto the task.
    pub fn apply_reconciliation(&mut self, subtasks: &[Subtask]) -> Reconciliation {
        let result = reconcile(self.completed, subtasks);
        self.progress = result.progress;
        self.completed = result.completed;
        result
    }
}

/// Apply a direct task update.
///
/// An explicit `progress` in the patch is stored as given, together with
/// whatever `completed` the patch carries. Otherwise, when subtasks exist,
/// both fields are derived from them and override the patch.
pub fn apply_direct_update(task: &mut Task, patch: &TaskPatch, subtasks: &[Subtask]) {
    patch.apply(task);
    if patch.progress.is_none() {
        if let Some(progress) = recompute_progress(subtasks) {
            task.progress = progress;
            task.completed = progress == 100;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{NewSubtask, NewTask, TaskId};
    use crate::user::UserId;

    fn subtasks(states: &[bool]) -> Vec<Subtask> {
        let task_id = TaskId::new();
        states
            .iter()
            .enumerate()
            .map(|(i, &completed)| Subtask::new(task_id, NewSubtask { title: format!("step {}", i + 1), completed }))
            .collect()
    }

    fn task() -> Task {
        Task::new(UserId::new(), NewTask::new("Plan trip", "2024-06-01"))
    }

    #[test]
    fn half_done_is_fifty_percent_and_open() {
        let result = reconcile(true, &subtasks(&[true, false]));
        assert_eq!(result, Reconciliation { progress: 50, completed: false });
    }

    #[test]
    fn all_done_completes_task() {
        let result = reconcile(false, &subtasks(&[true, true, true]));
        assert_eq!(result, Reconciliation { progress: 100, completed: true });
    }

    #[test]
    fn progress_rounds_down() {
        assert_eq!(reconcile(false, &subtasks(&[true, false, false])).progress, 33);
        assert_eq!(reconcile(false, &subtasks(&[true, true, false])).progress, 66);
        assert_eq!(progress_ratio(1, 7), 14);
    }

    #[test]
    fn empty_set_resets_progress_and_keeps_completion() {
        assert_eq!(reconcile(true, &[]), Reconciliation { progress: 0, completed: true });
        assert_eq!(reconcile(false, &[]), Reconciliation { progress: 0, completed: false });
        assert_eq!(recompute_progress(&[]), None);
    }

    #[test]
    fn reconciliation_is_idempotent() {
        let subs = subtasks(&[true, false, true, true]);
        let mut task = task();

        let first = task.apply_reconciliation(&subs);
        let snapshot = (task.progress, task.completed);
        let second = task.apply_reconciliation(&subs);

        assert_eq!(first, second);
        assert_eq!(snapshot, (task.progress, task.completed));
        assert_eq!(task.progress, 75);
    }

    #[test]
    fn direct_update_with_explicit_progress_wins() {
        let mut task = task();
        let patch = TaskPatch {
            progress: Some(80),
            completed: Some(true),
            ..TaskPatch::default()
        };
        apply_direct_update(&mut task, &patch, &subtasks(&[true, false]));
        assert_eq!(task.progress, 80);
        assert!(task.completed);
    }

    #[test]
    fn direct_completion_is_overridden_by_open_subtasks() {
        let mut task = task();
        let patch = TaskPatch {
            completed: Some(true),
            ..TaskPatch::default()
        };
        apply_direct_update(&mut task, &patch, &subtasks(&[true, false, false, false]));
        assert_eq!(task.progress, 25);
        assert!(!task.completed);
    }

    #[test]
    fn direct_reopen_is_overridden_when_all_subtasks_done() {
        let mut task = task();
        let patch = TaskPatch {
            completed: Some(false),
            ..TaskPatch::default()
        };
        apply_direct_update(&mut task, &patch, &subtasks(&[true, true]));
        assert_eq!(task.progress, 100);
        assert!(task.completed);
    }

    #[test]
    fn direct_update_without_subtasks_keeps_progress() {
        let mut task = task();
        task.progress = 40;
        let patch = TaskPatch {
            title: Some("Plan holiday".to_string()),
            ..TaskPatch::default()
        };
        apply_direct_update(&mut task, &patch, &[]);
        assert_eq!(task.progress, 40);
        assert_eq!(task.title, "Plan holiday");
    }
}
