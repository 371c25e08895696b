//! Error types for the todo store.
//!
//! # Design
//! Every store operation returns `Result<_, StoreError>`. The variants are the
//! failure kinds a presentation layer needs to tell apart: connectivity
//! (`Transport`), rejected credentials (`Auth`), rejected registration
//! (`Signup`), credential persistence (`Storage`) and "no session"
//! (`MissingCredential`). Non-2xx answers to todo operations land in `Api`
//! with the status and the server's message. None of these are retried.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, warn};

/// Failure to complete an HTTP round-trip. A non-2xx status is not a
/// transport failure; it arrives as an `HttpResponse`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("service unreachable: {0}")]
    Unreachable(String),

    #[error("request timed out")]
    Timeout,
}

/// Failure of the persistent credential storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing store cannot be used at all.
    #[error("credential storage unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error while {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid credential key '{0}'")]
    InvalidKey(String),
}

impl StorageError {
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

/// Errors returned by `Store` operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Credentials or token rejected by the service.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Registration rejected by the service.
    #[error("signup failed: {0}")]
    Signup(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A todo operation was attempted without a session token.
    #[error("not logged in: no session token")]
    MissingCredential,

    /// The service answered a todo operation with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// A 2xx response body could not be decoded.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Log a failed store operation and hand the error back unchanged, for use
/// with `map_err` on every failure path.
pub(crate) fn report(operation: &'static str) -> impl Fn(StoreError) -> StoreError {
    move |err| {
        match &err {
            StoreError::MissingCredential => debug!(operation, "rejected: no session token"),
            _ => warn!(operation, error = %err, "operation failed"),
        }
        err
    }
}
