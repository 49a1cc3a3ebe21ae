//! # Filesystem-backed storage
//!
//! [`FileStorage`] is a [`Storage`] implementation that keeps each key in its own
//! file. It is used on desktop and mobile platforms so the session survives an
//! app restart.
//!
//! ## Layout
//!
//! ```text
//! <base_dir>/
//! ├── auth-storage       # persisted session wrapper (JSON)
//! └── auth_token         # raw access token
//! ```
//!
//! Key characters outside `[A-Za-z0-9._-]` are replaced with `_` so a key can
//! never escape the base directory.
//!
//! ## Platform data directories
//!
//! [`FileStorage::default_dir`] uses [`dirs::data_dir()`]:
//!
//! | Platform | Path |
//! |----------|------|
//! | macOS / iOS | `~/Library/Application Support/rewardsy/` |
//! | Linux | `~/.local/share/rewardsy/` |
//! | Windows | `C:\Users\<user>\AppData\Roaming\rewardsy\` |

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::storage::{Storage, StorageError};

/// Filesystem-backed Storage for desktop and mobile persistence.
#[derive(Clone, Debug)]
pub struct FileStorage {
    base: PathBuf,
}

impl FileStorage {
    pub fn new(base: PathBuf) -> Self {
        Self { base }
    }

    /// `<data_dir>/rewardsy`, or `./rewardsy` when the platform has no data dir.
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rewardsy")
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn key_path(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        // "." and ".." survive the filter above
        let file_name = match file_name.as_str() {
            "" | "." | ".." => format!("_{file_name}"),
            _ => file_name,
        };
        self.base.join(file_name)
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.key_path(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.base)?;
        std::fs::write(self.key_path(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
