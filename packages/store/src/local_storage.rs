//! Browser `window.localStorage` backend for the web build.
//!
//! Values are plain strings, so nothing needs serialising on the JS side.
//! Browsers can refuse storage (private mode, quota, sandboxed iframes); a
//! refused handle reports `available() == false` and behaves like
//! [`NullStorage`](crate::NullStorage).

use wasm_bindgen::JsValue;

use crate::storage::{Storage, StorageError};

#[derive(Clone, Debug, Default)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        Self
    }

    fn handle(&self) -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok().flatten()
    }
}

fn browser_error(e: JsValue) -> StorageError {
    StorageError::Browser(format!("{e:?}"))
}

impl Storage for LocalStorage {
    fn available(&self) -> bool {
        self.handle().is_some()
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.handle() {
            Some(storage) => storage.get_item(key).map_err(browser_error),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        match self.handle() {
            Some(storage) => storage.set_item(key, value).map_err(browser_error),
            None => Ok(()),
        }
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match self.handle() {
            Some(storage) => storage.remove_item(key).map_err(browser_error),
            None => Ok(()),
        }
    }
}
