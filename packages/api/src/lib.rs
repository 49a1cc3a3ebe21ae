//! # API crate: the remote contract the Rewardsy client stores depend on
//!
//! The session and task stores never talk HTTP themselves. They go through the
//! [`RemoteApi`] trait defined here, so the same store logic runs against the
//! real backend ([`HttpApi`]) or an in-process double in tests.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Loads [`store::ClientConfig`] from `rewardsy.toml`, `.env` and environment overrides |
//! | [`error`] | [`ApiError`] taxonomy and the message normalisation used for display |
//! | [`http`] | `reqwest` implementation of [`RemoteApi`] against the Rewardsy REST backend |
//!
//! ## Contract
//!
//! - **Authentication**: `login`, `register`, `logout`, `reset_password`
//! - **Tasks**: `get_tasks`, `get_task`, `create_task`, `update_task`, `delete_task`
//! - **Activity**: `get_activity`
//!
//! Every method fails with an [`ApiError`] whose message is suitable for direct
//! display to the user.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

pub mod config;
pub mod error;
pub mod http;

pub use error::ApiError;
pub use http::HttpApi;
pub use store::{Activity, NewTask, Priority, Task, TaskPatch, User};

/// Email + password login.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Profile submitted when creating an account.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.email.clone(), self.password.clone())
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A successful authentication: who logged in and the bearer token to use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

/// Async interface to the Rewardsy backend.
pub trait RemoteApi {
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<AuthSession, ApiError>>;
    fn register(
        &self,
        registration: &Registration,
    ) -> impl Future<Output = Result<AuthSession, ApiError>>;
    fn logout(&self) -> impl Future<Output = Result<(), ApiError>>;
    fn reset_password(&self, email: &str) -> impl Future<Output = Result<(), ApiError>>;

    /// The full task list, in server order.
    fn get_tasks(&self) -> impl Future<Output = Result<Vec<Task>, ApiError>>;
    fn get_task(&self, id: &str) -> impl Future<Output = Result<Task, ApiError>>;
    fn create_task(&self, data: &NewTask) -> impl Future<Output = Result<Task, ApiError>>;
    fn update_task(
        &self,
        id: &str,
        patch: &TaskPatch,
    ) -> impl Future<Output = Result<Task, ApiError>>;
    fn delete_task(&self, id: &str) -> impl Future<Output = Result<(), ApiError>>;

    /// Up to `limit` activity entries, newest first.
    fn get_activity(&self, limit: u32) -> impl Future<Output = Result<Vec<Activity>, ApiError>>;
}
