//! HTTP client abstraction: POST-JSON with per-call timeout and raw
//! response surfacing.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

/// Response for any HTTP status code, including 4xx/5xx.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

/// Connection-level failure (DNS, refused, TLS, timeout). The dispatcher
/// treats this identically to a 5xx response.
#[derive(Debug, thiserror::Error)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

/// Contract for posting a JSON body and getting back a raw response.
/// Connection retry is disabled inside implementations — the circuit
/// breaker owns retry policy, not the transport.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        timeout: Duration,
        headers: &HashMap<String, String>,
    ) -> Result<HttpResponse, TransportError>;
}

/// Production transport backed by `reqwest`. Connection pooling mirrors
/// a conservative client configuration: no automatic retries, one pool
/// per host, idle connections recycled after 90s.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        timeout: Duration,
        headers: &HashMap<String, String>,
    ) -> Result<HttpResponse, TransportError> {
        let mut req = self.client.post(url).json(body).timeout(timeout);
        for (k, v) in headers {
            req = req.header(k, v);
        }

        let response = req.send().await.map_err(|e| TransportError(e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = response.text().await.ok();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
