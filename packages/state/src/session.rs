//! # Session store, the single authority for who is logged in
//!
//! [`SessionStore`] mediates every auth-mutating operation and owns the only
//! copy of the current [`User`]. It is an ordinary value: build one per
//! application context and hand out references, there is no global instance.
//!
//! ## State
//!
//! [`SessionState`] lives in a `tokio::sync::watch` channel. Readers take a
//! [`snapshot`](SessionStore::snapshot) or [`subscribe`](SessionStore::subscribe)
//! to re-render on change. Writes happen only inside this module, each one a
//! synchronous modification between awaits, so overlapping operations interleave
//! at their network calls and the last one to resume wins.
//!
//! ## Failure handling
//!
//! `login`, `register` and `reset_password` record the normalised message in
//! `error` and hand the original [`ApiError`] back to the caller. `logout` is the
//! exception: it always succeeds locally, whatever the server said.
//!
//! ## Hydration
//!
//! [`hydrate`](SessionStore::hydrate) restores the persisted user (only when a
//! valid-looking token is stored alongside it) and then flips `has_hydrated`
//! once. Until then [`gate`](SessionStore::gate) answers [`AuthGate::Pending`],
//! so a reload is never mistaken for a logout.

use std::sync::Arc;

use api::{ApiError, Credentials, Registration, RemoteApi};
use chrono::Utc;
use store::config::StorageConfig;
use store::{Storage, User};
use tokio::sync::watch;

use crate::persist::{self, StorageKeys};

/// Live session state. Only `user` is persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub user: Option<User>,
    /// An auth operation is in flight.
    pub loading: bool,
    /// Message of the last failed operation.
    pub error: Option<String>,
    /// Persisted state has been restored into memory.
    pub has_hydrated: bool,
}

/// Answer to "may this view assume a logged-in user?".
#[derive(Debug, Clone, PartialEq)]
pub enum AuthGate {
    /// Persisted state not restored yet; make no redirect decision.
    Pending,
    Authenticated(User),
    Anonymous,
}

pub struct SessionStore<A, S> {
    api: Arc<A>,
    storage: S,
    keys: StorageKeys,
    state: watch::Sender<SessionState>,
}

impl<A: RemoteApi, S: Storage> SessionStore<A, S> {
    pub fn new(api: Arc<A>, storage: S, config: &StorageConfig) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            api,
            storage,
            keys: StorageKeys::from(config),
            state,
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().user.is_some()
    }

    pub fn has_hydrated(&self) -> bool {
        self.state.borrow().has_hydrated
    }

    pub fn gate(&self) -> AuthGate {
        let state = self.state.borrow();
        match (&state.user, state.has_hydrated) {
            (_, false) => AuthGate::Pending,
            (Some(user), true) => AuthGate::Authenticated(user.clone()),
            (None, true) => AuthGate::Anonymous,
        }
    }

    /// Resolve once persisted state has been restored.
    pub async fn wait_for_hydration(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so this cannot observe a closed channel
        let _ = rx.wait_for(|s| s.has_hydrated).await;
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        tracing::debug!("login");
        self.begin();

        match self.api.login(&Credentials::new(email, password)).await {
            Ok(session) => {
                self.store_token(Some(&session.token));
                self.finish_with_user(Some(session.user.clone()));
                tracing::info!("Logged in as user {}", session.user.id);
                Ok(session.user)
            }
            Err(e) => Err(self.fail(e, "Login failed")),
        }
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, ApiError> {
        tracing::debug!("register");
        self.begin();

        match self.api.register(&Registration::new(name, email, password)).await {
            Ok(session) => {
                self.store_token(Some(&session.token));
                self.finish_with_user(Some(session.user.clone()));
                tracing::info!("Registered user {}", session.user.id);
                Ok(session.user)
            }
            Err(e) => Err(self.fail(e, "Registration failed")),
        }
    }

    /// End the session. Always leaves the store logged out.
    pub async fn logout(&self) {
        tracing::debug!("logout");
        self.begin();

        if let Err(e) = self.api.logout().await {
            tracing::warn!("Remote logout failed, clearing local session anyway: {}", e);
        }

        self.store_token(None);
        self.finish_with_user(None);
        tracing::info!("Logged out");
    }

    pub async fn reset_password(&self, email: &str) -> Result<(), ApiError> {
        tracing::debug!("reset_password");
        self.begin();

        match self.api.reset_password(email).await {
            Ok(()) => {
                self.state.send_modify(|s| s.loading = false);
                Ok(())
            }
            Err(e) => Err(self.fail(e, "Password reset failed")),
        }
    }

    /// Assign the user directly, without a network call.
    pub fn set_user(&self, user: Option<User>) {
        self.state.send_modify(|s| s.user = user);
        self.persist();
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|s| s.error = None);
    }

    /// Restore the persisted user if a valid-looking token backs it.
    ///
    /// Does nothing when the storage is not available. When either half is
    /// missing or the token is unusable, the user stays empty and the stale
    /// persisted entries are removed.
    pub fn initialize_auth(&self) {
        if !self.storage.available() {
            tracing::debug!("initialize_auth: no durable storage, skipping");
            return;
        }

        let user = persist::restore_session(&self.storage, &self.keys).unwrap_or_else(|e| {
            tracing::warn!("Discarding unreadable persisted session: {}", e);
            None
        });
        let token = self.storage.get(&self.keys.token).unwrap_or_else(|e| {
            tracing::warn!("Failed to read access token: {}", e);
            None
        });

        match (user, token) {
            (Some(user), Some(token)) if persist::token_looks_valid(&token, Utc::now()) => {
                tracing::debug!("Restored session for user {}", user.id);
                self.state.send_modify(|s| s.user = Some(user));
            }
            (user, token) => {
                if user.is_some() || token.is_some() {
                    tracing::info!("Stored session is not usable, clearing it");
                }
                self.store_token(None);
                self.set_user(None);
            }
        }
    }

    /// Mark persisted state as restored. Only the first `true` takes effect.
    pub fn set_has_hydrated(&self, hydrated: bool) {
        self.state.send_if_modified(|s| {
            if s.has_hydrated {
                if !hydrated {
                    tracing::warn!("Ignoring attempt to reset the hydration flag");
                }
                return false;
            }
            s.has_hydrated = hydrated;
            hydrated
        });
    }

    /// Run restoration once: `initialize_auth` then `set_has_hydrated(true)`.
    pub fn hydrate(&self) {
        if self.has_hydrated() {
            return;
        }
        self.initialize_auth();
        self.set_has_hydrated(true);
    }

    fn begin(&self) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
    }

    fn finish_with_user(&self, user: Option<User>) {
        self.state.send_modify(|s| {
            s.user = user;
            s.loading = false;
            s.error = None;
        });
        self.persist();
    }

    fn fail(&self, e: ApiError, fallback: &str) -> ApiError {
        let message = e.user_message(fallback);
        tracing::warn!("{}: {}", fallback, e);
        self.state.send_modify(|s| {
            s.loading = false;
            s.error = Some(message);
        });
        e
    }

    fn persist(&self) {
        let session = persist::persisted_subset(&self.state.borrow());
        if let Err(e) = persist::save_session(&self.storage, &self.keys, &session) {
            tracing::warn!("Failed to persist session: {}", e);
        }
    }

    fn store_token(&self, token: Option<&str>) {
        let result = match token {
            Some(token) => self.storage.set(&self.keys.token, token),
            None => self.storage.remove(&self.keys.token),
        };
        if let Err(e) = result {
            tracing::warn!("Failed to persist access token: {}", e);
        }
    }
}
