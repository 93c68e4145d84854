//! Page fetching: one bounded GET per URL, handed to the normaliser.
//!
//! Failures never propagate as errors to the aggregator; they come back as
//! [`FetchFailure`] values so a bad candidate is simply rejected.

use std::future::Future;
use std::time::Instant;

use url::Url;

use crate::config::PipelineConfig;
use crate::encoding;
use crate::error::{FetchFailure, SearchError};
use crate::http;
use crate::normalize;
use crate::types::{FetchResult, Passage};

/// Retrieves and normalises a single page.
///
/// The aggregator only depends on this trait, so tests can drive it with an
/// in-memory fetcher. Implementations must be `Send + Sync` because fetches
/// for one request may run concurrently.
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return its normalised title and content.
    ///
    /// Content is returned as normalised, before menu stripping or truncation.
    fn fetch(&self, url: &str) -> impl Future<Output = FetchResult> + Send;
}

/// [`PageFetcher`] backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    /// Build a fetcher using the timeout and User-Agent from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &PipelineConfig) -> Result<Self, SearchError> {
        let client = http::build_client(config.fetch_timeout(), config.user_agent.as_deref())?;
        Ok(Self {
            client,
            timeout_secs: config.fetch_timeout_secs,
        })
    }

    async fn fetch_page(&self, url: &str) -> FetchResult {
        let parsed = Url::parse(url).map_err(|_| FetchFailure::UnsupportedScheme(url.to_owned()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchFailure::UnsupportedScheme(url.to_owned()));
        }

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        if let Some(media_type) = content_type.as_deref().and_then(non_text_media_type) {
            return Err(FetchFailure::UnsupportedContentType(media_type));
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchFailure::Timeout(self.timeout_secs)
            } else {
                FetchFailure::Body(e.to_string())
            }
        })?;

        let declared = content_type
            .as_deref()
            .and_then(encoding::charset_from_content_type);
        let resolved = encoding::resolve(&body, declared);
        let page = normalize::normalize(&body, resolved);

        tracing::debug!(
            url,
            bytes = body.len(),
            encoding = resolved.name(),
            "page normalised"
        );

        Ok(Passage {
            url: url.to_owned(),
            title: page.title,
            content: page.content,
        })
    }

    fn classify(&self, err: reqwest::Error) -> FetchFailure {
        if err.is_timeout() {
            FetchFailure::Timeout(self.timeout_secs)
        } else {
            FetchFailure::Transport(err.to_string())
        }
    }
}

/// The bare media type of `content_type` when it is not a text document.
///
/// `text/*` and the XML/XHTML types pass; a missing or empty header is
/// treated as text.
fn non_text_media_type(content_type: &str) -> Option<String> {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let is_text = media_type.is_empty()
        || media_type.starts_with("text/")
        || matches!(
            media_type.as_str(),
            "application/xhtml+xml" | "application/xml"
        );
    (!is_text).then_some(media_type)
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        let started = Instant::now();
        let outcome = self.fetch_page(url).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(page) => tracing::info!(url, elapsed_ms, chars = page.content.len(), "fetched"),
            Err(failure) => tracing::info!(url, elapsed_ms, reason = %failure, "fetch failed"),
        }
        outcome
    }
}
