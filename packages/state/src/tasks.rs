//! # Task collection store
//!
//! [`TaskStore`] is the in-memory cache of the current user's tasks. The
//! collection changes only after the server confirms a change, so a failed call
//! never has to be rolled back.
//!
//! | Method | On success | On failure |
//! |--------|-----------|------------|
//! | [`fetch_all`](TaskStore::fetch_all) / [`refetch`](TaskStore::refetch) | replace collection, server order | collection kept |
//! | [`create`](TaskStore::create) | append returned task | collection kept |
//! | [`refresh`](TaskStore::refresh) | replace element in place | element kept (removed on `404`) |
//! | [`update`](TaskStore::update) / [`complete`](TaskStore::complete) | replace element in place | element kept |
//! | [`delete`](TaskStore::delete) | remove element | element kept |
//!
//! Failures set the shared `error` message and are also returned to the caller.
//! Every operation clears the previous error when it starts. `loading` tracks
//! list fetches only.
//!
//! There is no retry, cancellation or request fencing. Overlapping calls each
//! apply their own result when their response arrives; see [`crate::apply`].

use std::sync::Arc;

use api::{ApiError, RemoteApi};
use store::{NewTask, Task, TaskPatch};
use tokio::sync::watch;

use crate::apply;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskState {
    pub tasks: Vec<Task>,
    /// A list fetch is in flight.
    pub loading: bool,
    pub error: Option<String>,
}

pub struct TaskStore<A> {
    api: Arc<A>,
    state: watch::Sender<TaskState>,
}

impl<A: RemoteApi> TaskStore<A> {
    pub fn new(api: Arc<A>) -> Self {
        let (state, _) = watch::channel(TaskState::default());
        Self { api, state }
    }

    pub fn snapshot(&self) -> TaskState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TaskState> {
        self.state.subscribe()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.borrow().tasks.clone()
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        self.state.borrow().tasks.iter().find(|t| t.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn fetch_all(&self) -> Result<(), ApiError> {
        tracing::debug!("fetch_all");
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });

        let result = self.api.get_tasks().await;

        match result {
            Ok(tasks) => {
                tracing::debug!("Fetched {} tasks", tasks.len());
                self.state.send_modify(|s| {
                    apply::apply_fetched(s, tasks);
                    s.loading = false;
                    s.error = None;
                });
                Ok(())
            }
            Err(e) => {
                self.state.send_modify(|s| s.loading = false);
                Err(self.fail(e, "Failed to fetch tasks"))
            }
        }
    }

    /// Fetch a fresh snapshot after an out-of-band change.
    pub async fn refetch(&self) -> Result<(), ApiError> {
        self.fetch_all().await
    }

    /// Re-read one task after an out-of-band change.
    ///
    /// A `404` means the task is gone on the server, so it is dropped locally
    /// as well.
    pub async fn refresh(&self, id: &str) -> Result<Task, ApiError> {
        tracing::debug!("refresh: {}", id);
        self.clear_error();

        match self.api.get_task(id).await {
            Ok(task) => {
                let task = task.normalized();
                self.state
                    .send_if_modified(|s| apply::apply_updated(s, id, task.clone()));
                Ok(task)
            }
            Err(e) => {
                if e.status() == Some(404) {
                    self.state.send_if_modified(|s| apply::apply_deleted(s, id));
                }
                Err(self.fail(e, "Failed to fetch task"))
            }
        }
    }

    pub async fn create(&self, data: NewTask) -> Result<Task, ApiError> {
        tracing::debug!("create: {}", data.title);
        self.clear_error();

        if let Err(message) = data.validate() {
            return Err(self.fail(ApiError::Invalid(message), "Failed to create task"));
        }

        match self.api.create_task(&data).await {
            Ok(task) => {
                let task = task.normalized();
                self.state
                    .send_modify(|s| apply::apply_created(s, task.clone()));
                Ok(task)
            }
            Err(e) => Err(self.fail(e, "Failed to create task")),
        }
    }

    pub async fn update(&self, id: &str, patch: TaskPatch) -> Result<Task, ApiError> {
        tracing::debug!("update: {}", id);
        self.clear_error();

        match self.api.update_task(id, &patch).await {
            Ok(task) => {
                let task = task.normalized();
                let applied = self
                    .state
                    .send_if_modified(|s| apply::apply_updated(s, id, task.clone()));
                if !applied {
                    tracing::debug!("Task {} was removed before its update landed", id);
                }
                Ok(task)
            }
            Err(e) => Err(self.fail(e, "Failed to update task")),
        }
    }

    pub async fn complete(&self, id: &str, completed: bool) -> Result<Task, ApiError> {
        self.update(id, TaskPatch::completion(completed)).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        tracing::debug!("delete: {}", id);
        self.clear_error();

        match self.api.delete_task(id).await {
            Ok(()) => {
                self.state.send_if_modified(|s| apply::apply_deleted(s, id));
                Ok(())
            }
            Err(e) => Err(self.fail(e, "Failed to delete task")),
        }
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|s| s.error.take().is_some());
    }

    /// Drop every cached task, e.g. when the session's user changes.
    pub fn reset(&self) {
        self.state.send_replace(TaskState::default());
    }

    fn fail(&self, e: ApiError, fallback: &str) -> ApiError {
        let message = e.user_message(fallback);
        tracing::warn!("{}: {}", fallback, e);
        self.state.send_modify(|s| s.error = Some(message));
        e
    }
}
