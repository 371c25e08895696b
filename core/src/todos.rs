//! The local todo collection and the CRUD operations that reconcile it with
//! the service.
//!
//! # Design
//! Every mutation is server-authoritative: the collection changes only after
//! a 2xx response, and only with data the server returned. A failed call
//! leaves the collection exactly as it was.
//!
//! Each operation reads the session token at call time from the in-memory
//! session (the single source of truth) and fails fast with
//! `MissingCredential` when there is none, before any network traffic. Its
//! result is committed only if that same token is still current.

use tracing::{debug, info};

use crate::client::FetchOutcome;
use crate::config::EmptyFetchPolicy;
use crate::error::{report, StoreError};
use crate::state::{StateCell, StoreEvent};
use crate::transport::Remote;
use crate::types::{NewTodo, TodoId, TodoItem};

/// Ordered todo items with unique ids. Order is the server's return order,
/// with newly added items appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoCollection {
    items: Vec<TodoItem>,
}

impl TodoCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TodoItem> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[TodoItem] {
        &self.items
    }

    pub fn get(&self, id: &TodoId) -> Option<&TodoItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    pub fn contains(&self, id: &TodoId) -> bool {
        self.get(id).is_some()
    }

    /// Replace the whole collection. A repeated id keeps its first position
    /// and takes the later content.
    pub fn replace_all(&mut self, items: Vec<TodoItem>) {
        self.items.clear();
        for item in items {
            self.upsert(item);
        }
    }

    /// Append `item`, or replace in place if its id is already present.
    pub fn upsert(&mut self, item: TodoItem) {
        match self.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
    }

    /// Replace the item with `item.id`. Returns false when absent.
    pub fn replace(&mut self, item: TodoItem) -> bool {
        match self.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => {
                *existing = item;
                true
            }
            None => false,
        }
    }

    /// Remove the item with `id`. Returns the removed item.
    pub fn remove(&mut self, id: &TodoId) -> Option<TodoItem> {
        let index = self.items.iter().position(|item| &item.id == id)?;
        Some(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn to_vec(&self) -> Vec<TodoItem> {
        self.items.clone()
    }
}

impl<'a> IntoIterator for &'a TodoCollection {
    type Item = &'a TodoItem;
    type IntoIter = std::slice::Iter<'a, TodoItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

pub(crate) struct ResourceStore {
    remote: Remote,
    state: StateCell,
    empty_fetch: EmptyFetchPolicy,
}

impl ResourceStore {
    pub(crate) fn new(remote: Remote, state: StateCell, empty_fetch: EmptyFetchPolicy) -> Self {
        Self {
            remote,
            state,
            empty_fetch,
        }
    }

    fn require_token(&self, operation: &'static str) -> Result<String, StoreError> {
        self.state
            .current_token()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| report(operation)(StoreError::MissingCredential))
    }

    pub(crate) async fn fetch_all(&self) -> Result<(), StoreError> {
        let fail = report("fetch_todos");
        let token = self.require_token("fetch_todos")?;
        let client = self.remote.client();
        let response = self
            .remote
            .send(client.build_list_todos(&token))
            .await
            .map_err(&fail)?;

        match client.parse_list_todos(response, self.empty_fetch).map_err(&fail)? {
            FetchOutcome::Replace(items) => {
                let count = items.len();
                let applied = self
                    .state
                    .commit_for_token(&token, StoreEvent::TodosFetched, |s| {
                        s.todos.replace_all(items);
                        true
                    });
                if applied {
                    info!(count, "todos fetched");
                } else {
                    debug!("session changed during fetch; result discarded");
                }
            }
            FetchOutcome::KeepExisting => debug!("empty fetch; keeping existing todos"),
        }
        Ok(())
    }

    pub(crate) async fn add(&self, new_item: &NewTodo) -> Result<TodoItem, StoreError> {
        let fail = report("add_todo");
        let token = self.require_token("add_todo")?;
        let client = self.remote.client();
        let request = client.build_create_todo(&token, new_item).map_err(&fail)?;
        let response = self.remote.send(request).await.map_err(&fail)?;
        let created = client.parse_create_todo(response).map_err(&fail)?;

        let item = created.clone();
        let applied = self
            .state
            .commit_for_token(&token, StoreEvent::TodoAdded(created.id.clone()), |s| {
                s.todos.upsert(item);
                true
            });
        if applied {
            debug!(id = %created.id, "todo added");
        }
        Ok(created)
    }

    /// Returns the server's version of the item, which is what the
    /// collection now holds.
    pub(crate) async fn update(&self, updated: &TodoItem) -> Result<TodoItem, StoreError> {
        let fail = report("update_todo");
        let token = self.require_token("update_todo")?;
        let client = self.remote.client();
        let request = client.build_update_todo(&token, updated).map_err(&fail)?;
        let response = self.remote.send(request).await.map_err(&fail)?;
        let returned = client.parse_update_todo(response).map_err(&fail)?;

        if returned.id != updated.id {
            return Err(fail(StoreError::Deserialization(format!(
                "update of todo {} answered with todo {}",
                updated.id, returned.id
            ))));
        }

        let item = returned.clone();
        let applied = self
            .state
            .commit_for_token(&token, StoreEvent::TodoUpdated(returned.id.clone()), |s| {
                s.todos.replace(item)
            });
        if !applied {
            debug!(id = %returned.id, "updated todo not applied locally");
        }
        Ok(returned)
    }

    pub(crate) async fn delete(&self, id: &TodoId) -> Result<(), StoreError> {
        let fail = report("delete_todo");
        let token = self.require_token("delete_todo")?;
        let client = self.remote.client();
        let response = self
            .remote
            .send(client.build_delete_todo(&token, id))
            .await
            .map_err(&fail)?;
        client.parse_delete_todo(response).map_err(&fail)?;

        self.state
            .commit_for_token(&token, StoreEvent::TodoDeleted(id.clone()), |s| {
                s.todos.remove(id).is_some()
            });
        Ok(())
    }
}
