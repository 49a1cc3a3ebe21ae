pub mod config;
pub mod models;
pub mod storage;

mod file_store;
pub use file_store::FileStorage;

mod memory;
pub use memory::MemoryStorage;

#[cfg(all(target_arch = "wasm32", feature = "web"))]
mod local_storage;
#[cfg(all(target_arch = "wasm32", feature = "web"))]
pub use local_storage::LocalStorage;

pub use config::ClientConfig;
pub use models::{Activity, NewTask, Priority, Task, TaskPatch, User};
pub use storage::{NullStorage, Storage, StorageError};
