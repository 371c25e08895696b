//! The seam between the store and the network.
//!
//! The store never opens sockets itself. It hands each `HttpRequest` to a
//! `Transport` and interprets the `HttpResponse` that comes back. Any status
//! code is a response; only failing to complete the round-trip is an error.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::client::ApiClient;
use crate::error::{StoreError, TransportError};
use crate::http::{HttpRequest, HttpResponse};

/// Executes one HTTP round-trip.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// The codec paired with the transport that carries its requests.
#[derive(Clone)]
pub(crate) struct Remote {
    client: ApiClient,
    transport: Arc<dyn Transport>,
}

impl Remote {
    pub(crate) fn new(client: ApiClient, transport: Arc<dyn Transport>) -> Self {
        Self { client, transport }
    }

    pub(crate) fn client(&self) -> &ApiClient {
        &self.client
    }

    pub(crate) async fn send(&self, request: HttpRequest) -> Result<HttpResponse, StoreError> {
        debug!(method = %request.method, path = %request.path, "sending request");
        let response = self.transport.send(request).await?;
        debug!(status = response.status, "received response");
        Ok(response)
    }
}

#[cfg(feature = "ureq")]
pub use self::ureq_transport::UreqTransport;

#[cfg(feature = "ureq")]
mod ureq_transport {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::Transport;
    use crate::error::TransportError;
    use crate::http::{HttpMethod, HttpRequest, HttpResponse};

    /// Blocking `ureq` agent driven from tokio's blocking pool.
    ///
    /// Status codes are never turned into errors so 4xx/5xx answers reach the
    /// store as data.
    #[derive(Clone)]
    pub struct UreqTransport {
        agent: ureq::Agent,
    }

    impl UreqTransport {
        pub fn new(timeout: Option<Duration>) -> Self {
            let agent = ureq::Agent::config_builder()
                .http_status_as_error(false)
                .timeout_global(timeout)
                .build()
                .new_agent();
            Self { agent }
        }
    }

    impl Default for UreqTransport {
        fn default() -> Self {
            Self::new(Some(crate::config::DEFAULT_REQUEST_TIMEOUT))
        }
    }

    #[async_trait]
    impl Transport for UreqTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let agent = self.agent.clone();
            tokio::task::spawn_blocking(move || execute(&agent, request))
                .await
                .map_err(|e| TransportError::Unreachable(format!("transport task failed: {e}")))?
        }
    }

    fn with_headers<B>(
        builder: ureq::RequestBuilder<B>,
        headers: &[(String, String)],
    ) -> ureq::RequestBuilder<B> {
        headers
            .iter()
            .fold(builder, |b, (k, v)| b.header(k.as_str(), v.as_str()))
    }

    fn execute(agent: &ureq::Agent, req: HttpRequest) -> Result<HttpResponse, TransportError> {
        let body = req.body.unwrap_or_default();
        let result = match req.method {
            HttpMethod::Get => with_headers(agent.get(&req.path), &req.headers).call(),
            HttpMethod::Delete => with_headers(agent.delete(&req.path), &req.headers).call(),
            HttpMethod::Post => {
                with_headers(agent.post(&req.path), &req.headers).send(body.as_bytes())
            }
            HttpMethod::Put => with_headers(agent.put(&req.path), &req.headers).send(body.as_bytes()),
        };

        let mut response = result.map_err(|e| match e {
            ureq::Error::Timeout(_) => TransportError::Timeout,
            other => TransportError::Unreachable(other.to_string()),
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TransportError::Unreachable(format!("reading response body: {e}")))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
