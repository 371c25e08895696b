//! Scripted transport shared by the store tests.
//!
//! Responses are queued up front and handed out in order; every request the
//! store sends is recorded so tests can assert on what went over the wire,
//! or that nothing did.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use todo_sync::{
    HttpRequest, HttpResponse, MemoryCredentialStore, Store, StoreConfig, Transport, TransportError,
};

pub const BASE_URL: &str = "http://todo.test";

struct Scripted {
    gate: Option<Arc<Notify>>,
    result: Result<HttpResponse, TransportError>,
}

#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, status: u16, body: &str) {
        self.push(None, Ok(response(status, body)));
    }

    pub fn respond_json(&self, status: u16, body: serde_json::Value) {
        self.respond(status, &body.to_string());
    }

    /// Queue a response that is only delivered once `gate` is notified.
    pub fn respond_after(&self, gate: Arc<Notify>, status: u16, body: &str) {
        self.push(Some(gate), Ok(response(status, body)));
    }

    pub fn fail(&self, err: TransportError) {
        self.push(None, Err(err));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> HttpRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request was sent")
    }

    fn push(&self, gate: Option<Arc<Notify>>, result: Result<HttpResponse, TransportError>) {
        self.script.lock().unwrap().push_back(Scripted { gate, result });
    }
}

fn response(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: Vec::new(),
        body: body.to_string(),
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        let next = self.script.lock().unwrap().pop_front();
        let Some(next) = next else {
            return Err(TransportError::Unreachable("no scripted response left".to_string()));
        };
        if let Some(gate) = next.gate {
            gate.notified().await;
        }
        next.result
    }
}

pub struct Harness {
    pub store: Store,
    pub transport: Arc<ScriptedTransport>,
    pub credentials: Arc<MemoryCredentialStore>,
}

pub fn harness() -> Harness {
    harness_with(StoreConfig::new(BASE_URL), MemoryCredentialStore::new())
}

pub fn harness_with(config: StoreConfig, credentials: MemoryCredentialStore) -> Harness {
    let transport = ScriptedTransport::new();
    let credentials = Arc::new(credentials);
    let store = Store::new(config, transport.clone(), credentials.clone());
    Harness {
        store,
        transport,
        credentials,
    }
}

/// A harness already logged in as user 7 with token `T1`.
pub async fn logged_in() -> Harness {
    let h = harness();
    h.transport
        .respond_json(200, serde_json::json!({"token": "T1", "userId": 7}));
    h.store.login("alice", "pw1").await.unwrap();
    h
}
