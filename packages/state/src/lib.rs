//! # State crate
//!
//! Client-side stores for the Rewardsy app.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`session`] | [`SessionStore`]: login state, persistence and hydration |
//! | [`tasks`] | [`TaskStore`]: the cached task collection |
//! | [`persist`] | Persisted session layout and token checks |
//!
//! [`AppContext`] wires one of each to a shared [`api::RemoteApi`] client.

mod apply;
mod context;
pub mod persist;
pub mod session;
pub mod tasks;

#[cfg(test)]
mod testing;

pub use context::AppContext;
pub use session::{AuthGate, SessionState, SessionStore};
pub use tasks::{TaskState, TaskStore};
