//! In-memory stand-in for the todo service.
//!
//! Serves the `/api` surface the client consumes: signup, login, token
//! verification, and bearer-authenticated todo CRUD scoped to the calling
//! user. Todo ids are sequential integers, so listing order is creation order.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{FromRequestParts, Path, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: u64,
    pub title: String,
    pub description: String,
}

#[derive(Deserialize)]
pub struct TodoInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(rename = "userId")]
    pub user_id: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    #[serde(rename = "userId")]
    pub user_id: u64,
}

struct User {
    id: u64,
    password: String,
}

struct StoredTodo {
    owner: u64,
    todo: Todo,
}

#[derive(Default)]
pub struct Db {
    users: HashMap<String, User>,
    tokens: HashMap<String, u64>,
    todos: BTreeMap<u64, StoredTodo>,
    next_user_id: u64,
    next_todo_id: u64,
}

impl Db {
    /// Revoke every token issued so far, as a server-side session expiry.
    pub fn revoke_all_tokens(&mut self) {
        self.tokens.clear();
    }
}

pub type AppState = Arc<RwLock<Db>>;

/// A JSON `{error}` body with a status code.
pub struct ApiFailure(StatusCode, &'static str);

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

/// The user behind the request's bearer token.
pub struct AuthUser(pub u64);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiFailure;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(ApiFailure(StatusCode::UNAUTHORIZED, "Missing token"))?;
        state
            .read()
            .await
            .tokens
            .get(token)
            .copied()
            .map(AuthUser)
            .ok_or(ApiFailure(StatusCode::UNAUTHORIZED, "Invalid token"))
    }
}

pub fn app() -> Router {
    app_with_state(AppState::default())
}

/// Router over caller-owned state, so tests can reach into the database.
pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/api/signup", post(signup))
        .route("/api/login", post(login))
        .route("/api/verifyToken", get(verify_token))
        .route("/api/todos", get(list_todos).post(create_todo))
        .route("/api/todos/{id}", put(update_todo).delete(delete_todo))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, AppState::default()).await
}

pub async fn run_with_state(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

async fn signup(
    State(db): State<AppState>,
    Json(input): Json<Credentials>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiFailure> {
    if input.username.trim().is_empty() || input.password.is_empty() {
        return Err(ApiFailure(StatusCode::BAD_REQUEST, "Username and password are required"));
    }
    let mut db = db.write().await;
    if db.users.contains_key(&input.username) {
        return Err(ApiFailure(StatusCode::CONFLICT, "Username already exists"));
    }
    db.next_user_id += 1;
    let id = db.next_user_id;
    db.users.insert(
        input.username,
        User {
            id,
            password: input.password,
        },
    );
    tracing::info!(user_id = id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": "User created" })),
    ))
}

async fn login(
    State(db): State<AppState>,
    Json(input): Json<Credentials>,
) -> Result<Json<LoginResponse>, ApiFailure> {
    let mut db = db.write().await;
    let user_id = db
        .users
        .get(&input.username)
        .filter(|u| u.password == input.password)
        .map(|u| u.id)
        .ok_or(ApiFailure(StatusCode::UNAUTHORIZED, "Invalid credentials"))?;
    let token = Uuid::new_v4().to_string();
    db.tokens.insert(token.clone(), user_id);
    Ok(Json(LoginResponse { token, user_id }))
}

async fn verify_token(AuthUser(user_id): AuthUser) -> Json<VerifyResponse> {
    Json(VerifyResponse { user_id })
}

async fn list_todos(State(db): State<AppState>, AuthUser(user_id): AuthUser) -> Json<Vec<Todo>> {
    let db = db.read().await;
    Json(
        db.todos
            .values()
            .filter(|t| t.owner == user_id)
            .map(|t| t.todo.clone())
            .collect(),
    )
}

async fn create_todo(
    State(db): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(input): Json<TodoInput>,
) -> (StatusCode, Json<Todo>) {
    let mut db = db.write().await;
    db.next_todo_id += 1;
    let todo = Todo {
        id: db.next_todo_id,
        title: input.title,
        description: input.description,
    };
    db.todos.insert(
        todo.id,
        StoredTodo {
            owner: user_id,
            todo: todo.clone(),
        },
    );
    (StatusCode::CREATED, Json(todo))
}

async fn update_todo(
    State(db): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<u64>,
    Json(input): Json<TodoInput>,
) -> Result<Json<Todo>, ApiFailure> {
    let mut db = db.write().await;
    let stored = db
        .todos
        .get_mut(&id)
        .filter(|t| t.owner == user_id)
        .ok_or(ApiFailure(StatusCode::NOT_FOUND, "Todo not found"))?;
    stored.todo.title = input.title;
    stored.todo.description = input.description;
    Ok(Json(stored.todo.clone()))
}

async fn delete_todo(
    State(db): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiFailure> {
    let mut db = db.write().await;
    match db.todos.get(&id) {
        Some(t) if t.owner == user_id => {
            db.todos.remove(&id);
            Ok(StatusCode::NO_CONTENT)
        }
        _ => Err(ApiFailure(StatusCode::NOT_FOUND, "Todo not found")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn todo_serializes_to_json() {
        let todo = Todo {
            id: 1,
            title: "Buy milk".to_string(),
            description: String::new(),
        };
        let json = serde_json::to_value(&todo).unwrap();
        assert_eq!(json, serde_json::json!({"id": 1, "title": "Buy milk", "description": ""}));
    }

    #[test]
    fn login_response_uses_camel_case() {
        let json = serde_json::to_value(LoginResponse {
            token: "T1".to_string(),
            user_id: 7,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"token": "T1", "userId": 7}));
    }

    #[test]
    fn todo_input_defaults_description() {
        let input: TodoInput = serde_json::from_str(r#"{"title":"No description"}"#).unwrap();
        assert_eq!(input.title, "No description");
        assert_eq!(input.description, "");
    }

    #[test]
    fn todo_input_rejects_missing_title() {
        let result: Result<TodoInput, _> = serde_json::from_str(r#"{"description":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn failure_renders_error_body() {
        let response = ApiFailure(StatusCode::NOT_FOUND, "Todo not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
