//! Applying server-confirmed results to the local task collection.
//!
//! Every mutation of [`TaskState::tasks`] goes through one of these functions.
//! The policy is last-writer-wins: whichever confirmation is applied last
//! determines the local record, with no version comparison.

use store::Task;

use crate::tasks::TaskState;

/// Replace the whole collection, keeping server order.
pub(crate) fn apply_fetched(state: &mut TaskState, tasks: Vec<Task>) {
    state.tasks = tasks.into_iter().map(Task::normalized).collect();
}

/// Append a newly created task.
///
/// If a fetch that completed in the meantime already brought the task in, it is
/// replaced in place rather than duplicated.
pub(crate) fn apply_created(state: &mut TaskState, task: Task) {
    let task = task.normalized();
    match state.tasks.iter_mut().find(|t| t.id == task.id) {
        Some(existing) => *existing = task,
        None => state.tasks.push(task),
    }
}

/// Replace the task with `id` in place. Returns `false` when it is no longer local.
pub(crate) fn apply_updated(state: &mut TaskState, id: &str, task: Task) -> bool {
    match state.tasks.iter_mut().find(|t| t.id == id) {
        Some(existing) => {
            *existing = task.normalized();
            true
        }
        None => false,
    }
}

/// Remove the task with `id`. Returns `false` when it was not present.
pub(crate) fn apply_deleted(state: &mut TaskState, id: &str) -> bool {
    let before = state.tasks.len();
    state.tasks.retain(|t| t.id != id);
    state.tasks.len() != before
}
