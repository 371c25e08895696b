//! The composition root handed to the presentation layer.
//!
//! # Design
//! `Store` wires one `SessionManager` and one `ResourceStore` to a shared
//! `StateCell`, and exposes the union of their state and operations. It is
//! an ordinary value: construct one per process (or per test) and clone it
//! freely; clones share the same state.
//!
//! Reads return snapshots. Changes are observed through `subscribe` (latest
//! state) or `events` (what changed).

use std::sync::Arc;

use tokio::sync::{broadcast, watch};

use crate::client::ApiClient;
use crate::config::StoreConfig;
use crate::credentials::CredentialStore;
use crate::error::StoreError;
use crate::session::{InitOutcome, Session, SessionManager};
use crate::state::{StateCell, StoreEvent, StoreState};
use crate::todos::{ResourceStore, TodoCollection};
use crate::transport::{Remote, Transport};
use crate::types::{NewTodo, TodoId, TodoItem};

#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

struct Inner {
    config: StoreConfig,
    state: StateCell,
    session: SessionManager,
    todos: ResourceStore,
}

impl Store {
    pub fn new(
        config: StoreConfig,
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        let state = StateCell::new();
        let remote = Remote::new(ApiClient::new(&config.base_url), transport);
        let session = SessionManager::new(
            remote.clone(),
            credentials,
            config.credential_key.clone(),
            state.clone(),
        );
        let todos = ResourceStore::new(remote, state.clone(), config.empty_fetch);
        Self {
            inner: Arc::new(Inner {
                config,
                state,
                session,
                todos,
            }),
        }
    }

    /// Store backed by a blocking `ureq` agent honoring `config.request_timeout`.
    #[cfg(feature = "ureq")]
    pub fn with_ureq(config: StoreConfig, credentials: Arc<dyn CredentialStore>) -> Self {
        let transport = Arc::new(crate::transport::UreqTransport::new(config.request_timeout));
        Self::new(config, transport, credentials)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    // -- state ----------------------------------------------------------------

    pub fn state(&self) -> StoreState {
        self.inner.state.snapshot()
    }

    pub fn session(&self) -> Session {
        self.state().session
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().session.is_authenticated()
    }

    /// While true, render neither the logged-in nor the logged-out UI.
    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn todos(&self) -> TodoCollection {
        self.state().todos
    }

    /// Receiver that always holds the latest state.
    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.inner.state.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.state.events()
    }

    // -- session ----------------------------------------------------------------

    /// Restore a persisted session. Call once at process start.
    pub async fn initialize(&self) -> Result<InitOutcome, StoreError> {
        self.inner.session.initialize().await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(), StoreError> {
        self.inner.session.login(username, password).await
    }

    pub async fn logout(&self) -> Result<(), StoreError> {
        self.inner.session.logout().await
    }

    pub async fn signup(&self, username: &str, password: &str) -> Result<(), StoreError> {
        self.inner.session.signup(username, password).await
    }

    // -- todos ------------------------------------------------------------------

    pub async fn fetch_todos(&self) -> Result<(), StoreError> {
        self.inner.todos.fetch_all().await
    }

    pub async fn add_todo(&self, new_item: &NewTodo) -> Result<TodoItem, StoreError> {
        self.inner.todos.add(new_item).await
    }

    pub async fn update_todo(&self, updated: &TodoItem) -> Result<TodoItem, StoreError> {
        self.inner.todos.update(updated).await
    }

    pub async fn delete_todo(&self, id: &TodoId) -> Result<(), StoreError> {
        self.inner.todos.delete(id).await
    }
}
