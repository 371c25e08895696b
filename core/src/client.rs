//! Stateless HTTP request builder and response parser for the todo API.
//!
//! # Design
//! `ApiClient` holds only a `base_url` and carries no mutable state between
//! calls. Each endpoint is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! Tokens are passed in per call so the caller decides which credential a
//! request carries at the moment it is built.

use url::form_urlencoded;

use crate::config::EmptyFetchPolicy;
use crate::error::StoreError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::session::Session;
use crate::types::{
    Credentials, ErrorBody, LoginResponse, NewTodo, TodoId, TodoItem, VerifyResponse,
};

const LOGIN_FALLBACK: &str = "Login failed";
const SIGNUP_FALLBACK: &str = "Signup failed";
const VERIFY_FALLBACK: &str = "Token verification failed";
const FETCH_FALLBACK: &str = "Failed to fetch todos";
const ADD_FALLBACK: &str = "Failed to add todo";
const UPDATE_FALLBACK: &str = "Failed to update todo";
const DELETE_FALLBACK: &str = "Failed to delete todo";

/// Result of parsing a list response under an `EmptyFetchPolicy`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Replace(Vec<TodoItem>),
    KeepExisting,
}

/// Synchronous, stateless client for the todo API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -- session endpoints --------------------------------------------------

    pub fn build_login(&self, username: &str, password: &str) -> Result<HttpRequest, StoreError> {
        self.credentials_request("/api/login", username, password)
    }

    pub fn build_signup(&self, username: &str, password: &str) -> Result<HttpRequest, StoreError> {
        self.credentials_request("/api/signup", username, password)
    }

    pub fn build_verify_token(&self, token: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: format!("{}/api/verifyToken", self.base_url),
            headers: vec![bearer(token)],
            body: None,
        }
    }

    /// A 2xx without both a token and a user id is still a failed login.
    pub fn parse_login(&self, response: HttpResponse) -> Result<Session, StoreError> {
        if !response.is_success() {
            return Err(StoreError::Auth(server_message(&response, LOGIN_FALLBACK)));
        }
        let login: LoginResponse = decode(&response.body)?;
        if login.token.is_empty() {
            return Err(StoreError::Auth("login response did not include a token".to_string()));
        }
        let user_id = login
            .user_id
            .ok_or_else(|| StoreError::Auth("login response did not include a user id".to_string()))?;
        Ok(Session::authenticated(user_id, login.token))
    }

    pub fn parse_signup(&self, response: HttpResponse) -> Result<(), StoreError> {
        if !response.is_success() {
            return Err(StoreError::Signup(server_message(&response, SIGNUP_FALLBACK)));
        }
        Ok(())
    }

    pub fn parse_verify_token(&self, response: HttpResponse) -> Result<VerifyResponse, StoreError> {
        if !response.is_success() {
            return Err(StoreError::Auth(server_message(&response, VERIFY_FALLBACK)));
        }
        decode(&response.body)
    }

    // -- todo endpoints -----------------------------------------------------

    pub fn build_list_todos(&self, token: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: format!("{}/api/todos", self.base_url),
            headers: vec![bearer(token)],
            body: None,
        }
    }

    pub fn build_create_todo(&self, token: &str, input: &NewTodo) -> Result<HttpRequest, StoreError> {
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: format!("{}/api/todos", self.base_url),
            headers: vec![bearer(token), json_content_type()],
            body: Some(encode(input)?),
        })
    }

    /// PUT addressed by `item.id`; only `title` and `description` are sent.
    pub fn build_update_todo(&self, token: &str, item: &TodoItem) -> Result<HttpRequest, StoreError> {
        Ok(HttpRequest {
            method: HttpMethod::Put,
            path: self.todo_path(&item.id),
            headers: vec![bearer(token), json_content_type()],
            body: Some(encode(&NewTodo::from(item))?),
        })
    }

    /// `/api/todos/{id}` with the id escaped as a single path segment.
    fn todo_path(&self, id: &TodoId) -> String {
        let segment: String = form_urlencoded::byte_serialize(id.to_string().as_bytes()).collect();
        format!("{}/api/todos/{}", self.base_url, segment.replace('+', "%20"))
    }

    pub fn build_delete_todo(&self, token: &str, id: &TodoId) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Delete,
            path: self.todo_path(id),
            headers: vec![bearer(token)],
            body: None,
        }
    }

    /// A blank body, `null` or `[]` counts as empty; `policy` decides whether
    /// that clears the local collection.
    pub fn parse_list_todos(
        &self,
        response: HttpResponse,
        policy: EmptyFetchPolicy,
    ) -> Result<FetchOutcome, StoreError> {
        check_status(&response, FETCH_FALLBACK)?;
        let items: Vec<TodoItem> = if response.body.trim().is_empty() {
            Vec::new()
        } else {
            decode::<Option<Vec<TodoItem>>>(&response.body)?.unwrap_or_default()
        };
        if items.is_empty() && policy == EmptyFetchPolicy::KeepExisting {
            return Ok(FetchOutcome::KeepExisting);
        }
        Ok(FetchOutcome::Replace(items))
    }

    pub fn parse_create_todo(&self, response: HttpResponse) -> Result<TodoItem, StoreError> {
        check_status(&response, ADD_FALLBACK)?;
        decode(&response.body)
    }

    pub fn parse_update_todo(&self, response: HttpResponse) -> Result<TodoItem, StoreError> {
        check_status(&response, UPDATE_FALLBACK)?;
        decode(&response.body)
    }

    pub fn parse_delete_todo(&self, response: HttpResponse) -> Result<(), StoreError> {
        check_status(&response, DELETE_FALLBACK)
    }

    fn credentials_request(
        &self,
        path: &str,
        username: &str,
        password: &str,
    ) -> Result<HttpRequest, StoreError> {
        let body = encode(&Credentials {
            username: username.to_string(),
            password: password.to_string(),
        })?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: format!("{}{path}", self.base_url),
            headers: vec![json_content_type()],
            body: Some(body),
        })
    }
}

fn bearer(token: &str) -> (String, String) {
    ("authorization".to_string(), format!("Bearer {token}"))
}

fn json_content_type() -> (String, String) {
    ("content-type".to_string(), "application/json".to_string())
}

fn encode<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, StoreError> {
    serde_json::from_str(body).map_err(|e| StoreError::Deserialization(e.to_string()))
}

/// Map a non-2xx todo response to `StoreError::Api`.
fn check_status(response: &HttpResponse, fallback: &str) -> Result<(), StoreError> {
    if response.is_success() {
        return Ok(());
    }
    Err(StoreError::Api {
        status: response.status,
        message: server_message(response, fallback),
    })
}

/// The `{error}` field of a failure body, or `fallback` when the body is
/// missing, not JSON, or carries no message.
fn server_message(response: &HttpResponse, fallback: &str) -> String {
    serde_json::from_str::<ErrorBody>(&response.body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}
