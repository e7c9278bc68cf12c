//! HTTP JSON-RPC client backed by `reqwest`, with retry and backoff for
//! transient failures.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};
use crate::retry::{RetryConfig, RetryPolicy};
use crate::transport::RpcTransport;

/// Configuration for [`HttpRpcClient`].
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub retry: RetryConfig,
    pub request_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&chainwatch_core::WatchConfig> for HttpClientConfig {
    fn from(config: &chainwatch_core::WatchConfig) -> Self {
        Self {
            retry: RetryConfig::with_max_retries(config.max_retries),
            request_timeout: config.request_timeout(),
        }
    }
}

pub struct HttpRpcClient {
    url: String,
    http: reqwest::Client,
    retry: RetryPolicy,
    request_timeout: Duration,
}

impl HttpRpcClient {
    /// Create a client for the JSON-RPC endpoint at `url`.
    pub fn new(url: impl Into<String>, config: HttpClientConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            http,
            retry: RetryPolicy::new(config.retry),
            request_timeout: config.request_timeout,
        })
    }

    async fn send_once(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let resp = self
            .http
            .post(&self.url)
            .json(req)
            .send()
            .await
            .map_err(|e| self.map_reqwest(e))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Http(format!("HTTP {status}: {body}")));
        }

        let body = resp.bytes().await.map_err(|e| self.map_reqwest(e))?;
        Ok(serde_json::from_slice(&body)?)
    }

    fn map_reqwest(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                ms: self.request_timeout.as_millis() as u64,
            }
        } else {
            TransportError::Http(e.to_string())
        }
    }
}

#[async_trait]
impl RpcTransport for HttpRpcClient {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let mut attempt = 0u32;
        loop {
            match self.send_once(&req).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_retryable() => {
                    attempt += 1;
                    let Some(delay) = self.retry.next_delay(attempt) else {
                        tracing::error!(
                            method = %req.method,
                            attempts = attempt,
                            error = %e,
                            url = %self.url,
                            "RPC request failed, retries exhausted"
                        );
                        return Err(e);
                    };
                    tracing::warn!(
                        method = %req.method,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        url = %self.url,
                        "Retrying RPC request"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn url(&self) -> &str {
        &self.url
    }
}
