//! Hosted search API backend (Brave Search JSON API).
//!
//! Requires an API key. Results come back grouped by category; the
//! configured categories are merged in priority order and deduplicated by
//! URL. Further pages are requested only when the consumer needs them.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use futures::StreamExt;
use serde::Deserialize;

use crate::backend::{CandidateStream, SearchBackend};
use crate::config::BackendConfig;
use crate::error::SearchError;
use crate::http;
use crate::types::{ApiCategory, BackendKind, Candidate};

/// Largest `count` the API accepts per page.
const MAX_COUNT: usize = 20;

/// Largest page `offset` the API accepts.
const MAX_OFFSET: usize = 9;

#[derive(Clone)]
pub struct ApiBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    categories: Vec<ApiCategory>,
    safe_search: bool,
    page_delay: Duration,
}

impl std::fmt::Debug for ApiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiBackend")
            .field("endpoint", &self.endpoint)
            .field("categories", &self.categories)
            .field("safe_search", &self.safe_search)
            .finish_non_exhaustive()
    }
}

impl ApiBackend {
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if no API key is configured, or
    /// [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, SearchError> {
        let api_key = config
            .api_key()
            .ok_or_else(|| SearchError::Config("the api backend requires an API key".into()))?
            .to_owned();
        Ok(Self {
            client: http::build_client(config.timeout(), None)?,
            endpoint: config.api_endpoint.clone(),
            api_key,
            categories: config.api_categories.clone(),
            safe_search: config.safe_search,
            page_delay: config.page_delay(),
        })
    }

    async fn fetch_page(&self, query: &str, count: usize, offset: usize) -> Result<Vec<String>, SearchError> {
        let filter = self
            .categories
            .iter()
            .map(ApiCategory::name)
            .collect::<Vec<_>>()
            .join(",");
        let count = count.to_string();
        let offset = offset.to_string();
        let safe = if self.safe_search { "strict" } else { "off" };

        let response = self
            .client
            .get(&self.endpoint)
            .header("X-Subscription-Token", &self.api_key)
            .header("Accept", "application/json")
            .query(&[
                ("q", query),
                ("count", count.as_str()),
                ("offset", offset.as_str()),
                ("result_filter", filter.as_str()),
                ("safesearch", safe),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout(format!("search API request timed out: {e}"))
                } else {
                    SearchError::Http(format!("search API request failed: {e}"))
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(SearchError::Backend(format!(
                "search API rejected the API key (HTTP {})",
                status.as_u16()
            )));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::Backend("search API rate limit exceeded".into()));
        }
        if !status.is_success() {
            return Err(SearchError::Http(format!(
                "search API HTTP error: {}",
                status.as_u16()
            )));
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Parse(format!("search API JSON parse error: {e}")))?;

        Ok(body.urls(&self.categories))
    }
}

impl SearchBackend for ApiBackend {
    fn search(&self, query: &str, limit: usize) -> CandidateStream {
        tracing::debug!(query, limit, "search API query");

        let state = ApiState {
            backend: self.clone(),
            query: query.to_owned(),
            count: limit.clamp(1, MAX_COUNT),
            offset: 0,
            exhausted: false,
            pending: VecDeque::new(),
            seen_urls: HashSet::new(),
            remaining: limit,
        };

        futures::stream::unfold(state, |mut state| async move {
            loop {
                if state.remaining == 0 {
                    return None;
                }
                if let Some(url) = state.pending.pop_front() {
                    state.remaining -= 1;
                    return Some((Ok(Candidate::Url(url)), state));
                }
                if state.exhausted || state.offset > MAX_OFFSET {
                    return None;
                }
                if state.offset > 0 && !state.backend.page_delay.is_zero() {
                    tokio::time::sleep(state.backend.page_delay).await;
                }

                let page = state
                    .backend
                    .fetch_page(&state.query, state.count, state.offset)
                    .await;
                state.offset += 1;
                match page {
                    Ok(urls) => {
                        let before = state.pending.len();
                        for url in urls {
                            if state.seen_urls.insert(url.clone()) {
                                state.pending.push_back(url);
                            }
                        }
                        if state.pending.len() == before {
                            state.exhausted = true;
                        }
                    }
                    Err(err) => {
                        state.remaining = 0;
                        return Some((Err(err), state));
                    }
                }
            }
        })
        .boxed()
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Api
    }
}

struct ApiState {
    backend: ApiBackend,
    query: String,
    count: usize,
    offset: usize,
    exhausted: bool,
    pending: VecDeque<String>,
    seen_urls: HashSet<String>,
    remaining: usize,
}

#[derive(Debug, Default, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    web: Option<ApiSection>,
    #[serde(default)]
    news: Option<ApiSection>,
    #[serde(default)]
    discussions: Option<ApiSection>,
    #[serde(default)]
    videos: Option<ApiSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiSection {
    #[serde(default)]
    results: Vec<ApiResult>,
}

#[derive(Debug, Deserialize)]
struct ApiResult {
    url: String,
}

impl ApiResponse {
    /// URLs of the requested categories, in category order.
    fn urls(self, categories: &[ApiCategory]) -> Vec<String> {
        let ApiResponse {
            mut web,
            mut news,
            mut discussions,
            mut videos,
        } = self;
        let mut urls = Vec::new();
        for category in categories {
            let section = match category {
                ApiCategory::Web => web.take(),
                ApiCategory::News => news.take(),
                ApiCategory::Discussions => discussions.take(),
                ApiCategory::Videos => videos.take(),
            };
            if let Some(section) = section {
                urls.extend(section.results.into_iter().map(|r| r.url));
            }
        }
        urls
    }
}
