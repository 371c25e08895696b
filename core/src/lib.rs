//! Session-and-resource synchronization store for the todo service.
//!
//! # Overview
//! Authenticates a user, persists the session token across process restarts,
//! and keeps a local view of the user's todo items in step with the remote
//! API. Presentation code reads `Store` snapshots, calls its async
//! operations, and re-renders on change notifications.
//!
//! # Design
//! - `ApiClient` is a stateless codec: `build_*` produces an `HttpRequest`,
//!   `parse_*` consumes an `HttpResponse`.
//! - `Transport` performs the round-trip; `CredentialStore` persists the token.
//!   Both are traits so hosts and tests can supply their own.
//! - `Store` is the composition root. The in-memory session is the single
//!   source of truth for the token; storage is only read by `initialize`.
//! - Local state changes only after the server confirms, and each change is
//!   one atomic update followed by a notification.

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod session;
pub mod state;
pub mod store;
pub mod todos;
pub mod transport;
pub mod types;

pub use client::{ApiClient, FetchOutcome};
pub use config::{ConfigError, EmptyFetchPolicy, StoreConfig};
pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::{StorageError, StoreError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use session::{InitOutcome, Session};
pub use state::{StoreEvent, StoreState};
pub use store::Store;
pub use todos::TodoCollection;
pub use transport::Transport;
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
pub use types::{NewTodo, TodoId, TodoItem, UserId};
