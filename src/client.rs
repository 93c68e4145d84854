//! Synthetic client for a running gleaner server.

use std::time::Duration;

use gleaner_search::SearchResponse;

use crate::error::{Result, ServerError};
use crate::server::ErrorResponse;

/// Default request timeout. Aggregation fetches many pages, so this is
/// generous compared with a single page fetch.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Posts `{q, n}` forms to a server and parses the JSON answer.
#[derive(Debug, Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    base_url: String,
}

impl SearchClient {
    /// Create a client for the server at `base_url` (e.g. `http://127.0.0.1:8080`).
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Client`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// # Errors
    ///
    /// Returns [`ServerError::Client`] if the HTTP client cannot be built.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServerError::Client(format!("failed to build HTTP client: {e}")))?;
        let mut base_url = base_url.into();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            base_url = format!("http://{base_url}");
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the server for `n` passages about `query`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Client`] on transport failures, non-200
    /// answers (carrying the server's error message) or unparseable bodies.
    pub async fn search(&self, query: &str, n: usize) -> Result<SearchResponse> {
        let url = format!("{}/", self.base_url.trim_end_matches('/'));
        let count = n.to_string();
        let response = self
            .http
            .post(&url)
            .form(&[("q", query), ("n", count.as_str())])
            .send()
            .await
            .map_err(|e| ServerError::Client(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ServerError::Client(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(ServerError::Client(format!("HTTP {}: {message}", status.as_u16())));
        }

        serde_json::from_str(&body).map_err(|e| ServerError::Client(format!("invalid response JSON: {e}")))
    }
}
