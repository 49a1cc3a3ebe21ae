//! # Persisted session layout
//!
//! Only the user record survives a reload. Loading and error flags are
//! process-local and never written. The access token sits under its own key and
//! is the authority for whether a restored user may be trusted.
//!
//! ## Layout
//!
//! | Key (default) | Value |
//! |---------------|-------|
//! | `auth-storage` | `{"state":{"user":{...} or null},"version":0}` |
//! | `auth_token` | the raw bearer token |
//!
//! [`persisted_subset`] is the only place a live [`SessionState`] is narrowed to
//! what gets written; [`restore_session`] is its inverse.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use store::config::StorageConfig;
use store::{Storage, StorageError, User};

use crate::session::SessionState;

/// Layout version written with the wrapper.
pub const PERSIST_VERSION: u32 = 0;

/// Storage keys used by the session store.
#[derive(Clone, Debug, PartialEq)]
pub struct StorageKeys {
    pub session: String,
    pub token: String,
}

impl From<&StorageConfig> for StorageKeys {
    fn from(config: &StorageConfig) -> Self {
        Self {
            session: config.session_key.clone(),
            token: config.token_key.clone(),
        }
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self::from(&StorageConfig::default())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub user: Option<User>,
}

/// Wrapper object written under the session key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub state: PersistedState,
    #[serde(default)]
    pub version: u32,
}

/// Narrow a live session to the part that is persisted.
pub fn persisted_subset(state: &SessionState) -> PersistedSession {
    PersistedSession {
        state: PersistedState {
            user: state.user.clone(),
        },
        version: PERSIST_VERSION,
    }
}

pub fn save_session(
    storage: &impl Storage,
    keys: &StorageKeys,
    session: &PersistedSession,
) -> Result<(), StorageError> {
    let json = serde_json::to_string(session)?;
    storage.set(&keys.session, &json)
}

/// Read the persisted user back. A missing wrapper is `Ok(None)`.
pub fn restore_session(
    storage: &impl Storage,
    keys: &StorageKeys,
) -> Result<Option<User>, StorageError> {
    let Some(json) = storage.get(&keys.session)? else {
        return Ok(None);
    };
    let session: PersistedSession = serde_json::from_str(&json)?;
    Ok(session.state.user)
}

#[derive(Deserialize)]
struct Claims {
    #[serde(default)]
    exp: Option<i64>,
}

/// Whether `token` looks like a usable JWT at time `now`.
///
/// The signature is not checked (that is the server's job). The token must have
/// three non-empty base64url segments, a JSON payload, and if the payload has an
/// `exp` claim it must lie in the future.
pub fn token_looks_valid(token: &str, now: DateTime<Utc>) -> bool {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
        return false;
    }

    let Ok(payload) = URL_SAFE_NO_PAD.decode(segments[1].trim_end_matches('=')) else {
        return false;
    };
    let Ok(claims) = serde_json::from_slice::<Claims>(&payload) else {
        return false;
    };

    match claims.exp {
        Some(exp) => exp > now.timestamp(),
        None => true,
    }
}
