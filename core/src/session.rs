//! Authentication state and the operations that change it.
//!
//! # Design
//! `SessionManager` is the only writer of `Session`. A `Session` can only be
//! built anonymous or fully authenticated, so "authenticated", "user id
//! present" and "token present" cannot disagree.
//!
//! The persisted token and the in-memory session move together:
//! - login persists first, then flips the session. A storage failure after a
//!   successful HTTP login is returned and the session stays as it was.
//! - logout removes the persisted token first, then clears the session. A
//!   storage failure is returned and the session stays authenticated, which
//!   keeps memory consistent with what the next process start will see.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::credentials::CredentialStore;
use crate::error::{report, StorageError, StoreError};
use crate::state::{StateCell, StoreEvent};
use crate::transport::Remote;
use crate::types::UserId;

/// The authenticated identity held for this process lifetime.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    auth: Option<(UserId, String)>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { auth: None }
    }

    pub fn authenticated(user_id: UserId, token: String) -> Self {
        Self {
            auth: Some((user_id, token)),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.auth.as_ref().map(|(id, _)| id)
    }

    pub fn token(&self) -> Option<&str> {
        self.auth.as_ref().map(|(_, token)| token.as_str())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("is_authenticated", &self.is_authenticated())
            .field("user_id", &self.user_id())
            .field("token", &self.token().map(|_| "<redacted>"))
            .finish()
    }
}

/// How `initialize` resolved the persisted credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// Nothing was persisted.
    Anonymous,
    /// The persisted token was verified and the session restored.
    Restored,
    /// The service rejected the persisted token; it has been discarded.
    Rejected,
}

pub(crate) struct SessionManager {
    remote: Remote,
    credentials: Arc<dyn CredentialStore>,
    credential_key: String,
    state: StateCell,
}

impl SessionManager {
    pub(crate) fn new(
        remote: Remote,
        credentials: Arc<dyn CredentialStore>,
        credential_key: String,
        state: StateCell,
    ) -> Self {
        Self {
            remote,
            credentials,
            credential_key,
            state,
        }
    }

    fn client(&self) -> &ApiClient {
        self.remote.client()
    }

    /// Restore the session from the persisted token, if any.
    ///
    /// Always ends with `loading == false`. Re-reads storage on every call.
    pub(crate) async fn initialize(&self) -> Result<InitOutcome, StoreError> {
        let stored = match self.credentials.get(&self.credential_key).await {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                self.finish_loading_anonymous(InitOutcome::Anonymous, None);
                return Err(report("initialize")(e.into()));
            }
        };

        let Some(token) = stored else {
            info!("no persisted session");
            self.finish_loading_anonymous(InitOutcome::Anonymous, None);
            return Ok(InitOutcome::Anonymous);
        };

        let verified = match self.remote.send(self.client().build_verify_token(&token)).await {
            Ok(response) => self.client().parse_verify_token(response),
            Err(e) => Err(e),
        };

        match verified {
            Ok(verified) => {
                info!(user_id = %verified.user_id, "persisted session restored");
                self.state
                    .commit(StoreEvent::Initialized(InitOutcome::Restored), |s| {
                        s.session = Session::authenticated(verified.user_id, token);
                        s.loading = false;
                    });
                Ok(InitOutcome::Restored)
            }
            Err(err) => {
                warn!(error = %err, "persisted session could not be verified; discarding it");
                let discarded = self.discard_persisted(&token).await;
                self.finish_loading_anonymous(InitOutcome::Rejected, Some(&token));
                discarded.map_err(|e| report("initialize")(e.into()))?;
                match err {
                    StoreError::Transport(_) => Err(err),
                    _ => Ok(InitOutcome::Rejected),
                }
            }
        }
    }

    /// Remove `token` from storage unless a newer login has replaced it.
    async fn discard_persisted(&self, token: &str) -> Result<(), StorageError> {
        if self.state.current_token().is_some_and(|cur| cur != token) {
            debug!("session replaced during verification; keeping its token");
            return Ok(());
        }
        match self.credentials.get(&self.credential_key).await? {
            Some(stored) if stored == token => self.credentials.remove(&self.credential_key).await,
            Some(_) => {
                debug!("persisted token replaced during verification; keeping it");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Reset to anonymous and clear `loading`. With `only_token`, a session
    /// established concurrently under a different token is left alone.
    fn finish_loading_anonymous(&self, outcome: InitOutcome, only_token: Option<&str>) {
        self.state.commit(StoreEvent::Initialized(outcome), |s| {
            let replaced = only_token.is_some_and(|t| s.session.token().is_some_and(|cur| cur != t));
            if !replaced {
                s.session = Session::anonymous();
            }
            s.loading = false;
        });
    }

    pub(crate) async fn login(&self, username: &str, password: &str) -> Result<(), StoreError> {
        let fail = report("login");
        let request = self.client().build_login(username, password).map_err(&fail)?;
        let response = self.remote.send(request).await.map_err(&fail)?;
        let session = self.client().parse_login(response).map_err(&fail)?;

        let token = session.token().unwrap_or_default();
        self.credentials
            .set(&self.credential_key, token)
            .await
            .map_err(|e| fail(e.into()))?;

        info!(user_id = ?session.user_id(), "logged in");
        self.state.commit(StoreEvent::LoggedIn, |s| s.session = session);
        Ok(())
    }

    /// Clears the persisted token, then the session and the items it fetched.
    pub(crate) async fn logout(&self) -> Result<(), StoreError> {
        self.credentials
            .remove(&self.credential_key)
            .await
            .map_err(|e| report("logout")(e.into()))?;

        info!("logged out");
        self.state.commit(StoreEvent::LoggedOut, |s| {
            s.session = Session::anonymous();
            s.todos.clear();
        });
        Ok(())
    }

    /// Registers an account. The session is untouched; a separate login is
    /// required afterwards.
    pub(crate) async fn signup(&self, username: &str, password: &str) -> Result<(), StoreError> {
        let fail = report("signup");
        let request = self.client().build_signup(username, password).map_err(&fail)?;
        let response = self.remote.send(request).await.map_err(&fail)?;
        self.client().parse_signup(response).map_err(&fail)?;
        debug!(username, "account created");
        Ok(())
    }
}
