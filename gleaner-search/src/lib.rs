//! # gleaner-search
//!
//! Query-time content aggregation for Gleaner.
//!
//! Given a search phrase and a desired count `N`, this crate asks a search
//! backend for candidate pages, fetches and normalises each one to plain
//! text, filters out failures, empty pages, duplicates and blocked-access
//! pages, and returns up to `N` passages in acceptance order.
//!
//! ## Design
//!
//! - Backends produce a lazy [`CandidateStream`]; result pages are requested
//!   only as the aggregator pulls past the current one
//! - Three backends: DuckDuckGo HTML scraping, the Brave Search API, and
//!   DuckDuckGo descriptions rendered directly as content
//! - Pages are fetched a few at a time with per-fetch timeouts; decisions are
//!   made strictly in candidate order
//! - Body encoding comes from the declared charset, a BOM, or detection
//!
//! ## Security
//!
//! - Search queries are logged only at debug level
//! - API keys never appear in `Debug` output
//! - Only `http` and `https` URLs are fetched

pub mod backend;
pub mod backends;
pub mod config;
pub mod encoding;
pub mod error;
pub mod fetch;
pub mod http;
pub mod normalize;
pub mod orchestrator;
pub mod types;

pub use backend::{Backend, CandidateStream, SearchBackend};
pub use config::{BackendConfig, PipelineConfig};
pub use error::{FetchFailure, Result, SearchError};
pub use fetch::{HttpFetcher, PageFetcher};
pub use orchestrator::aggregate::{Aggregation, AggregationStats, ResultAggregator};
pub use orchestrator::assemble::SearchResponse;
pub use orchestrator::pipeline::Pipeline;
pub use types::{ApiCategory, BackendKind, Candidate, ContentItem, FetchResult, Passage, Query, RejectReason};

/// Answer `query` with the backend and fetcher described by the given
/// configuration.
///
/// Builds a fresh [`Pipeline`] for a one-off query; long-running callers
/// should build one with [`Pipeline::from_config`] and reuse it.
///
/// # Errors
///
/// Returns [`SearchError::Config`] if the configuration is invalid, or the
/// backend's error if it fails before producing any candidate.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> gleaner_search::Result<()> {
/// use gleaner_search::{BackendConfig, PipelineConfig, Query};
///
/// let query = Query::new("rust ownership", 3);
/// let response = gleaner_search::search(&query, PipelineConfig::default(), &BackendConfig::default()).await?;
/// for passage in &response.response {
///     println!("{}: {}", passage.title, passage.url);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn search(query: &Query, pipeline: PipelineConfig, backend: &BackendConfig) -> Result<SearchResponse> {
    Pipeline::from_config(pipeline, backend)?.answer(query).await
}

/// Fetch and normalise a single page, applying the configured content policy.
///
/// # Errors
///
/// Returns [`SearchError::Config`] if `config` is invalid, or
/// [`SearchError::Http`] describing why the page could not be fetched.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> gleaner_search::Result<()> {
/// let config = gleaner_search::PipelineConfig::default();
/// let page = gleaner_search::fetch_page("https://example.com", &config).await?;
/// println!("{}: {} bytes", page.title, page.content.len());
/// # Ok(())
/// # }
/// ```
pub async fn fetch_page(url: &str, config: &PipelineConfig) -> Result<Passage> {
    config.validate()?;
    let fetcher = HttpFetcher::new(config)?;
    let mut page = fetcher
        .fetch(url)
        .await
        .map_err(|failure| SearchError::Http(format!("{url}: {failure}")))?;
    page.content = normalize::ContentPolicy::from(config).apply(&page.content);
    Ok(page)
}
