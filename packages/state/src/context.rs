use std::path::PathBuf;
use std::sync::Arc;

use api::{ApiError, HttpApi, RemoteApi};
#[cfg(all(target_arch = "wasm32", feature = "web"))]
use store::LocalStorage;
use store::{Activity, ClientConfig, FileStorage, Storage, User};

use crate::session::SessionStore;
use crate::tasks::TaskStore;

/// One session store and one task store sharing an API client.
///
/// Switching users drops the previous user's cached tasks.
pub struct AppContext<A, S> {
    pub session: SessionStore<A, S>,
    pub tasks: TaskStore<A>,
    api: Arc<A>,
}

impl<A: RemoteApi, S: Storage + Clone> AppContext<A, S> {
    pub fn new(api: A, storage: S, config: &ClientConfig) -> Self {
        let api = Arc::new(api);
        Self {
            session: SessionStore::new(api.clone(), storage, &config.storage),
            tasks: TaskStore::new(api.clone()),
            api,
        }
    }

    /// Restore the persisted session. Call once before the first render.
    pub fn start(&self) {
        self.session.hydrate();
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let previous = self.session.user();
        let user = self.session.login(email, password).await?;
        self.reset_tasks_if_switched(previous.as_ref(), &user);
        Ok(user)
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, ApiError> {
        let previous = self.session.user();
        let user = self.session.register(name, email, password).await?;
        self.reset_tasks_if_switched(previous.as_ref(), &user);
        Ok(user)
    }

    pub async fn logout(&self) {
        self.session.logout().await;
        self.tasks.reset();
    }

    /// The user's recent activity, newest first. Not cached.
    pub async fn recent_activity(&self, limit: u32) -> Result<Vec<Activity>, ApiError> {
        self.api.get_activity(limit).await.inspect_err(|e| {
            tracing::warn!("Failed to fetch activity: {}", e);
        })
    }

    fn reset_tasks_if_switched(&self, previous: Option<&User>, user: &User) {
        if previous.map(|p| p.id.as_str()) != Some(user.id.as_str()) {
            tracing::debug!("Session user changed, dropping cached tasks");
            self.tasks.reset();
        }
    }
}

impl AppContext<HttpApi<FileStorage>, FileStorage> {
    /// Build the production stack: an HTTP client and file-backed storage.
    ///
    /// An empty `storage.dir` selects [`FileStorage::default_dir`].
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let dir = if config.storage.dir.is_empty() {
            FileStorage::default_dir()
        } else {
            PathBuf::from(&config.storage.dir)
        };
        tracing::info!("Using storage at {}", dir.display());

        let storage = FileStorage::new(dir);
        let api = HttpApi::new(config, storage.clone())?;
        Ok(Self::new(api, storage, config))
    }
}

#[cfg(all(target_arch = "wasm32", feature = "web"))]
impl AppContext<HttpApi<LocalStorage>, LocalStorage> {
    /// Build the browser stack: an HTTP client and `window.localStorage`.
    pub fn for_browser(config: &ClientConfig) -> Result<Self, ApiError> {
        let storage = LocalStorage::new();
        let api = HttpApi::new(config, storage.clone())?;
        Ok(Self::new(api, storage, config))
    }
}
