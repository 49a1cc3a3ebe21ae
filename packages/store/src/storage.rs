//! # Durable client storage: an opaque key-value capability
//!
//! The session layer persists a small amount of state (the user record and the
//! access token) across restarts. It only ever needs string values under fixed
//! keys, so the capability is a plain synchronous key-value trait. Backends live
//! in sibling modules (memory, file and, on the web, `localStorage`); [`NullStorage`]
//! stands in for execution contexts that have no durable storage at all.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage lock poisoned")]
    Poisoned,

    #[error("stored value is malformed: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("browser storage error: {0}")]
    Browser(String),
}

/// Key-value storage for persisted client state.
pub trait Storage {
    /// Whether this storage is backed by anything durable.
    fn available(&self) -> bool {
        true
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key. Removing a key that does not exist is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<S: Storage + ?Sized> Storage for std::sync::Arc<S> {
    fn available(&self) -> bool {
        (**self).available()
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// Storage for contexts without a persistence layer (e.g. server-side rendering).
///
/// Reads always miss and writes are discarded.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullStorage;

impl Storage for NullStorage {
    fn available(&self) -> bool {
        false
    }

    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }
}
