//! The I/O seam between the request builder and the network.
//!
//! # Design
//! `Transport` executes one `HttpRequest` and returns the raw
//! `HttpResponse`, whatever its status. Only failures that prevent a response
//! from arriving become `NetworkFailure`; status interpretation stays with
//! `SchoolClient`.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::NetworkFailure;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Per-request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes exactly one HTTP round-trip per call.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, NetworkFailure>;
}

/// `Transport` backed by a pooled `reqwest::Client`.
///
/// Cloning shares the underlying connection pool, so one instance can serve
/// any number of concurrent sessions.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, NetworkFailure> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(NetworkFailure::from)?;
        Ok(Self { http })
    }

    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, NetworkFailure> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };
        debug!(method = request.method.as_str(), url = %request.url, "http: sending request");

        let mut builder = self.http.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.text().await?;
        debug!(status, url = %request.url, "http: response received");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

impl From<reqwest::Error> for NetworkFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NetworkFailure::Timeout
        } else if err.is_connect() {
            NetworkFailure::Connect(err.to_string())
        } else {
            NetworkFailure::Io(err.to_string())
        }
    }
}
