//! # Client configuration: `rewardsy.toml`
//!
//! Defines the TOML configuration read when the client starts. It tells the API
//! client where the backend lives and tells the session store which storage keys
//! hold the persisted session and the access token.
//!
//! ## Structure
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:8000"
//! timeout_secs = 30
//! page_limit = 100        # page size for task fetches
//!
//! [storage]
//! dir = ""                # empty = platform data dir
//! session_key = "auth-storage"
//! token_key = "auth_token"
//! ```
//!
//! ## Types
//!
//! | Struct | Purpose |
//! |--------|---------|
//! | [`ClientConfig`] | Top-level config. Provides builder helpers (`with_base_url`, `with_storage_dir`), TOML (de)serialisation, and the canonical filename. |
//! | [`ApiConfig`] | Backend location, request timeout and page size. |
//! | [`StorageConfig`] | Storage directory and the two well-known keys. |
//!
//! All structs implement `Default` with production defaults, so a missing or
//! empty config file is equivalent to the default configuration.

use serde::{Deserialize, Serialize};

/// Top-level configuration stored in `rewardsy.toml`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Remote API configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Page size for task list requests. Pages are fetched until a short one arrives.
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_page_limit() -> u32 {
    100
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            page_limit: default_page_limit(),
        }
    }
}

/// Persisted-state configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for file-backed storage. Empty string means the platform data dir.
    #[serde(default)]
    pub dir: String,
    /// Key of the persisted session wrapper.
    #[serde(default = "default_session_key")]
    pub session_key: String,
    /// Key of the access token, stored separately from the session wrapper.
    #[serde(default = "default_token_key")]
    pub token_key: String,
}

fn default_session_key() -> String {
    "auth-storage".to_string()
}

fn default_token_key() -> String {
    "auth_token".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: String::new(),
            session_key: default_session_key(),
            token_key: default_token_key(),
        }
    }
}

impl ClientConfig {
    /// Builder method to point at another backend.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api.base_url = base_url.into();
        self
    }

    /// Builder method to set the storage directory.
    pub fn with_storage_dir(mut self, dir: impl Into<String>) -> Self {
        self.storage.dir = dir.into();
        self
    }

    /// The well-known filename for the config file.
    pub fn filename() -> &'static str {
        "rewardsy.toml"
    }

    /// Parse from TOML string.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Serialize to TOML string.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
