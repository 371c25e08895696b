//! Domain DTOs for the todo API.
//!
//! # Design
//! Identifiers are server-assigned and opaque to the client. Deployments of
//! the service differ on whether they hand out integer keys or document ids,
//! so `TodoId` and `UserId` accept either a JSON number or a JSON string and
//! echo back exactly what they received.
//!
//! Wire field names are camelCase (`userId`) to match the service.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

macro_rules! server_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        ///
        /// Equality and hashing follow the textual form, so `Text("42")`
        /// and `Number(42)` name the same item.
        #[derive(Debug, Clone, Serialize, Deserialize)]
        #[serde(untagged)]
        pub enum $name {
            Number(i64),
            Text(String),
        }

        impl $name {
            /// Parse an identifier from its textual form. All-digit text
            /// (optionally signed) becomes `Number`, anything else `Text`.
            pub fn parse(s: &str) -> Self {
                match s.parse::<i64>() {
                    Ok(n) => Self::Number(n),
                    Err(_) => Self::Text(s.to_string()),
                }
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                match (self, other) {
                    (Self::Number(a), Self::Number(b)) => a == b,
                    (Self::Text(a), Self::Text(b)) => a == b,
                    (Self::Number(n), Self::Text(s)) | (Self::Text(s), Self::Number(n)) => {
                        *s == n.to_string()
                    }
                }
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                match self {
                    Self::Number(n) => n.to_string().hash(state),
                    Self::Text(s) => s.hash(state),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    Self::Number(n) => write!(f, "{n}"),
                    Self::Text(s) => f.write_str(s),
                }
            }
        }

        impl From<i64> for $name {
            fn from(n: i64) -> Self {
                Self::Number(n)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::Text(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::Text(s)
            }
        }
    };
}

server_identifier! {
    /// Identifier of a todo item, immutable once the server assigns it.
    TodoId
}

server_identifier! {
    /// Identifier of the authenticated user.
    UserId
}

/// A single todo item as returned by the service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoItem {
    pub id: TodoId,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Request payload for creating a todo, also used as the body of an update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl NewTodo {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

impl From<&TodoItem> for NewTodo {
    fn from(item: &TodoItem) -> Self {
        Self {
            title: item.title.clone(),
            description: item.description.clone(),
        }
    }
}

/// Body of `POST /api/login` and `POST /api/signup`.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Successful `POST /api/login` body, validated by `ApiClient::parse_login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: String,
    #[serde(rename = "userId", default)]
    pub user_id: Option<UserId>,
}

/// Successful `GET /api/verifyToken` body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifyResponse {
    #[serde(rename = "userId")]
    pub user_id: UserId,
}

/// Error body the service attaches to non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}
