//! # Domain models for users and tasks
//!
//! Defines the records exchanged with the Rewardsy API and cached by the client
//! stores. Every type is `Serialize + Deserialize` so the same structs are used
//! for the wire format, for the persisted session, and for in-memory snapshots.
//!
//! ## Types
//!
//! | Struct | Represents |
//! |--------|-----------|
//! | [`User`] | The authenticated identity: opaque `id`, optional display `name`, and `email`. |
//! | [`Task`] | A unit of work owned by one user. Carries the completion flag and its timestamp, an optional reward label, and server-assigned audit timestamps. |
//! | [`NewTask`] | Creation payload. Has no completion fields, so a created task always starts not-completed. |
//! | [`TaskPatch`] | Partial update. Absent fields are omitted from the JSON body entirely; clearable fields can be sent as `null`. |
//! | [`Activity`] | One entry of the user's activity feed. |
//!
//! ## Completion invariant
//!
//! A task's `completed_at` is present if and only if `completed` is true.
//! [`Task::normalized`] restores that invariant on records coming back from the
//! server before they are applied locally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Ids are opaque strings locally; older backend revisions send integers.
fn id_from_string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(d)? {
        RawId::Text(id) => id,
        RawId::Number(id) => id.to_string(),
    })
}

/// User information returned by the authentication endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
}

impl User {
    /// Get display name, falling back to email if name is not set.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

/// Task priority. Serialised lowercase: `"low"`, `"medium"`, `"high"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// A task as confirmed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Reward label unlocked by completing the task.
    #[serde(default)]
    pub reward: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Whether the completion flag and timestamp agree.
    pub fn is_consistent(&self) -> bool {
        self.completed == self.completed_at.is_some()
    }

    /// Enforce the completion invariant.
    ///
    /// An incomplete task loses any stale `completed_at`. A completed task that
    /// arrives without a timestamp is stamped with its `updated_at`, the closest
    /// server-side time we have for the transition.
    pub fn normalized(mut self) -> Self {
        if !self.completed {
            self.completed_at = None;
        } else if self.completed_at.is_none() {
            self.completed_at = Some(self.updated_at);
        }
        self
    }
}

/// Payload for creating a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_reward(mut self, reward: impl Into<String>) -> Self {
        self.reward = Some(reward.into());
        self
    }

    /// Check the fields the server would reject outright.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Title is required".to_string());
        }
        Ok(())
    }
}

/// Keeps an explicit `null` apart from an absent field.
///
/// Paired with `#[serde(default)]`: absent deserializes to `None`, `null` to
/// `Some(None)`.
fn present_or_null<'de, D, T>(d: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(d).map(Some)
}

/// Partial update for a task. `None` means "leave unchanged".
///
/// The clearable fields are double options: `Some(None)` is sent as `null` and
/// removes the value on the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    pub description: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    pub reward: Option<Option<String>>,
}

impl TaskPatch {
    /// Patch that only toggles completion.
    pub fn completion(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Set the description, or clear it with `None`.
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    /// Set the due date, or clear it with `None`.
    pub fn with_due_date(mut self, due_date: Option<DateTime<Utc>>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the reward, or clear it with `None`.
    pub fn with_reward(mut self, reward: Option<String>) -> Self {
        self.reward = Some(reward);
        self
    }
}

/// One entry of the user's activity feed (`GET /user/activity`), newest first.
///
/// The feed is informational; every field is optional because the backend
/// copies them from loosely typed event metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// ISO-8601 as sent by the server.
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
}
