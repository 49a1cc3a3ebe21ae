//! In-process [`RemoteApi`] double used by the store tests.
//!
//! Holds a server-side task list, account table and activity feed. Individual calls can be
//! scripted to fail once, or gated so their response is held back until the
//! test releases it. The server-side effect of a gated call happens when the
//! call is made; only the response is delayed.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use api::{ApiError, AuthSession, Credentials, Registration, RemoteApi};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use store::{Activity, NewTask, Priority, Task, TaskPatch, User};
use tokio::sync::oneshot;

/// Build an unsigned JWT-shaped token carrying `claims`.
pub fn jwt(claims: &str) -> String {
    format!(
        "{}.{}.signature",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(claims)
    )
}

pub fn user(id: &str, email: &str) -> User {
    User {
        id: id.to_string(),
        name: None,
        email: email.to_string(),
    }
}

pub fn task(id: &str, title: &str, completed: bool) -> Task {
    let ts = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
    Task {
        id: id.to_string(),
        title: title.to_string(),
        description: None,
        due_date: None,
        priority: Priority::Medium,
        completed,
        completed_at: completed.then_some(ts),
        reward: None,
        created_at: ts,
        updated_at: ts,
    }
}

/// Apply the present fields of `patch` the way the backend does.
pub fn apply_patch(patch: &TaskPatch, task: &mut Task, now: DateTime<Utc>) {
    if let Some(title) = &patch.title {
        task.title = title.clone();
    }
    if let Some(description) = &patch.description {
        task.description = description.clone();
    }
    if let Some(due_date) = patch.due_date {
        task.due_date = due_date;
    }
    if let Some(priority) = patch.priority {
        task.priority = priority;
    }
    if let Some(reward) = &patch.reward {
        task.reward = reward.clone();
    }
    if let Some(completed) = patch.completed {
        if completed && !task.completed {
            task.completed_at = Some(now);
        } else if !completed {
            task.completed_at = None;
        }
        task.completed = completed;
    }
    task.updated_at = now;
}

#[derive(Default)]
struct Server {
    tasks: Vec<Task>,
    accounts: Vec<(User, String)>,
    next_id: u64,
    insert_first: bool,
    activity: Vec<Activity>,
    failures: HashMap<&'static str, VecDeque<ApiError>>,
    gates: HashMap<&'static str, VecDeque<oneshot::Receiver<()>>>,
    calls: Vec<&'static str>,
}

#[derive(Default)]
pub struct MockApi {
    server: Mutex<Server>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let api = Self::new();
        {
            let mut server = api.lock();
            server.next_id = tasks.len() as u64;
            server.tasks = tasks;
        }
        api
    }

    pub fn with_account(self, user: User, password: &str) -> Self {
        self.lock().accounts.push((user, password.to_string()));
        self
    }

    /// Insert created tasks at the head of the server list instead of the tail.
    pub fn insert_first(self) -> Self {
        self.lock().insert_first = true;
        self
    }

    /// Make the next call to `op` fail with `err`.
    pub fn fail(&self, op: &'static str, err: ApiError) {
        self.lock().failures.entry(op).or_default().push_back(err);
    }

    /// Hold back the response of the next call to `op` until the sender fires.
    pub fn gate(&self, op: &'static str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.lock().gates.entry(op).or_default().push_back(rx);
        tx
    }

    pub fn with_activity(self, activity: Vec<Activity>) -> Self {
        self.lock().activity = activity;
        self
    }

    /// Change a task behind the client's back, as another device would.
    pub fn edit_on_server(&self, id: &str, patch: &TaskPatch) {
        if let Some(task) = self.lock().tasks.iter_mut().find(|t| t.id == id) {
            apply_patch(patch, task, Utc::now());
        }
    }

    pub fn server_tasks(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Server> {
        self.server.lock().unwrap()
    }

    async fn respond<T>(
        &self,
        op: &'static str,
        handle: impl FnOnce(&mut Server) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let (result, gate) = {
            let mut server = self.lock();
            server.calls.push(op);
            let gate = server.gates.get_mut(op).and_then(|q| q.pop_front());
            let failure = server.failures.get_mut(op).and_then(|q| q.pop_front());
            let result = match failure {
                Some(err) => Err(err),
                None => handle(&mut *server),
            };
            (result, gate)
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        result
    }
}

fn not_found() -> ApiError {
    ApiError::Rejected {
        status: 404,
        message: Some("Task not found".to_string()),
    }
}

impl RemoteApi for MockApi {
    async fn login(&self, credentials: &Credentials) -> Result<AuthSession, ApiError> {
        self.respond("login", |server| {
            server
                .accounts
                .iter()
                .find(|(user, password)| {
                    user.email == credentials.email && *password == credentials.password
                })
                .map(|(user, _)| AuthSession {
                    user: user.clone(),
                    token: jwt(&format!(r#"{{"sub":"{}","user_id":"{}"}}"#, user.email, user.id)),
                })
                .ok_or(ApiError::Rejected {
                    status: 401,
                    message: Some("Invalid credentials".to_string()),
                })
        })
        .await
    }

    async fn register(&self, registration: &Registration) -> Result<AuthSession, ApiError> {
        self.respond("register", |server| {
            if server.accounts.iter().any(|(u, _)| u.email == registration.email) {
                return Err(ApiError::Rejected {
                    status: 400,
                    message: Some("User with this email already exists.".to_string()),
                });
            }
            let user = User {
                id: format!("u{}", server.accounts.len() + 1),
                name: Some(registration.name.clone()),
                email: registration.email.clone(),
            };
            server
                .accounts
                .push((user.clone(), registration.password.clone()));
            Ok(AuthSession {
                token: jwt(&format!(r#"{{"sub":"{}"}}"#, user.email)),
                user,
            })
        })
        .await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.respond("logout", |_| Ok(())).await
    }

    async fn reset_password(&self, email: &str) -> Result<(), ApiError> {
        self.respond("reset_password", |server| {
            if server.accounts.iter().any(|(u, _)| u.email == email) {
                Ok(())
            } else {
                Err(ApiError::Rejected {
                    status: 404,
                    message: Some("User not found".to_string()),
                })
            }
        })
        .await
    }

    async fn get_tasks(&self) -> Result<Vec<Task>, ApiError> {
        self.respond("get_tasks", |server| Ok(server.tasks.clone()))
            .await
    }

    async fn get_task(&self, id: &str) -> Result<Task, ApiError> {
        self.respond("get_task", |server| {
            server
                .tasks
                .iter()
                .find(|t| t.id == id)
                .cloned()
                .ok_or_else(not_found)
        })
        .await
    }

    async fn create_task(&self, data: &NewTask) -> Result<Task, ApiError> {
        self.respond("create_task", |server| {
            server.next_id += 1;
            let now = Utc::now();
            let task = Task {
                id: server.next_id.to_string(),
                title: data.title.clone(),
                description: data.description.clone(),
                due_date: data.due_date,
                priority: data.priority,
                completed: false,
                completed_at: None,
                reward: data.reward.clone(),
                created_at: now,
                updated_at: now,
            };
            if server.insert_first {
                server.tasks.insert(0, task.clone());
            } else {
                server.tasks.push(task.clone());
            }
            Ok(task)
        })
        .await
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Task, ApiError> {
        self.respond("update_task", |server| {
            let task = server
                .tasks
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(not_found)?;
            apply_patch(patch, task, Utc::now());
            Ok(task.clone())
        })
        .await
    }

    async fn delete_task(&self, id: &str) -> Result<(), ApiError> {
        self.respond("delete_task", |server| {
            let before = server.tasks.len();
            server.tasks.retain(|t| t.id != id);
            if server.tasks.len() == before {
                return Err(not_found());
            }
            Ok(())
        })
        .await
    }

    async fn get_activity(&self, limit: u32) -> Result<Vec<Activity>, ApiError> {
        self.respond("get_activity", |server| {
            Ok(server.activity.iter().take(limit as usize).cloned().collect())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_patch_clears_and_toggles() {
        let mut t = task("1", "Read", false);
        t.reward = Some("Coffee".to_string());
        let later = Utc.with_ymd_and_hms(2024, 5, 2, 10, 30, 0).unwrap();

        apply_patch(&TaskPatch::completion(true).with_reward(None), &mut t, later);
        assert!(t.completed);
        assert_eq!(t.completed_at, Some(later));
        assert!(t.reward.is_none());

        apply_patch(&TaskPatch::completion(false), &mut t, later);
        assert!(!t.completed);
        assert!(t.completed_at.is_none());
        assert!(t.is_consistent());
    }
}
