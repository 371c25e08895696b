//! Shared, observable store state.
//!
//! # Design
//! The whole client state lives in one `tokio::sync::watch` channel. Readers
//! get immutable `StoreState` snapshots; writers apply a closure through
//! `send_if_modified`, so every logical update (for example token, user id
//! and the authenticated flag together) lands as a single unit and wakes
//! subscribers once. A `broadcast` channel carries a `StoreEvent` describing
//! each committed change.
//!
//! Nothing here holds a lock across an `.await`: operations read what they
//! need, perform their network round-trip, then commit.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};

use crate::session::{InitOutcome, Session};
use crate::todos::TodoCollection;
use crate::types::TodoId;

const EVENT_CAPACITY: usize = 64;

/// Immutable snapshot of everything the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreState {
    pub session: Session,
    /// True from process start until `initialize` completes.
    pub loading: bool,
    pub todos: TodoCollection,
}

impl StoreState {
    fn initial() -> Self {
        Self {
            session: Session::anonymous(),
            loading: true,
            todos: TodoCollection::new(),
        }
    }
}

/// Emitted after each committed state change. Failed operations emit nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Initialized(InitOutcome),
    LoggedIn,
    LoggedOut,
    TodosFetched,
    TodoAdded(TodoId),
    TodoUpdated(TodoId),
    TodoDeleted(TodoId),
}

#[derive(Clone)]
pub(crate) struct StateCell {
    state: Arc<watch::Sender<StoreState>>,
    events: broadcast::Sender<StoreEvent>,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(StoreState::initial());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(state),
            events,
        }
    }

    pub(crate) fn snapshot(&self) -> StoreState {
        self.state.borrow().clone()
    }

    /// The token held right now, never a copy captured earlier.
    pub(crate) fn current_token(&self) -> Option<String> {
        self.state.borrow().session.token().map(str::to_string)
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.state.subscribe()
    }

    pub(crate) fn events(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Apply `update` as one atomic change and announce it.
    pub(crate) fn commit(&self, event: StoreEvent, update: impl FnOnce(&mut StoreState)) {
        self.state.send_modify(update);
        self.announce(event);
    }

    /// Apply `update` only while the session still holds `token`.
    ///
    /// A response that arrives after a logout, or after a different user
    /// logged in, must not leak into the new session's state. `update`
    /// reports whether it changed anything; nothing is announced otherwise.
    /// Returns whether the update was applied.
    pub(crate) fn commit_for_token(
        &self,
        token: &str,
        event: StoreEvent,
        update: impl FnOnce(&mut StoreState) -> bool,
    ) -> bool {
        let applied = self.state.send_if_modified(|state| {
            if state.session.token() != Some(token) {
                return false;
            }
            update(state)
        });
        if applied {
            self.announce(event);
        }
        applied
    }

    fn announce(&self, event: StoreEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
