//! Thin HTTP layer over the public exchange endpoints
//!
//! All adapters share one `reqwest` client with a per-request timeout.
//! Responses surface as status + body; interpreting either is the caller's job.
//!
//! Author: AI-Generated
//! Created: 2026-07-28

use crate::exchanges::ExchangeError;
use std::time::Duration;
use tracing::debug;

/// A settled HTTP response. `status` is kept separate from `body` so callers
/// can map non-200s to their own failure kind before decoding.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Shared client for all exchange requests.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(timeout_ms: u64) -> Result<Self, ExchangeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    /// GET a URL and collect the body. Transport-level problems (DNS, TLS,
    /// connect, per-request timeout) map to `ExchangeError::Transport`.
    pub async fn get(&self, url: &str) -> Result<HttpResponse, ExchangeError> {
        debug!("Sending request to [{}]", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }

    /// GET and fail on any non-200 status, returning the body on success.
    pub async fn get_ok(&self, url: &str) -> Result<String, ExchangeError> {
        let response = self.get(url).await?;
        if !response.is_ok() {
            return Err(ExchangeError::NonOkStatus(response.status));
        }
        Ok(response.body)
    }
}
