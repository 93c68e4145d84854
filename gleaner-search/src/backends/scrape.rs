//! DuckDuckGo HTML scraping: the generic scrape backend and the shared pager.
//!
//! Uses the HTML-only endpoint, which requires no JavaScript and is tolerant
//! of automated requests. Result pages are requested one at a time, only when
//! the consumer has drained the previous page.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use futures::stream::BoxStream;
use futures::StreamExt;
use scraper::{Html, Selector};
use url::Url;

use crate::backend::{CandidateStream, SearchBackend};
use crate::config::BackendConfig;
use crate::error::SearchError;
use crate::http;
use crate::types::{BackendKind, Candidate};

/// Upper bound on result pages requested for one query.
const MAX_PAGES: usize = 10;

/// One organic DuckDuckGo result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Hit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Parsed result page: its hits plus the form fields requesting the next page.
#[derive(Debug, Default)]
pub(crate) struct ResultPage {
    pub hits: Vec<Hit>,
    pub next: Option<Vec<(String, String)>>,
}

/// Lazily pages through DuckDuckGo HTML results.
#[derive(Debug, Clone)]
pub(crate) struct DuckDuckGoPager {
    client: reqwest::Client,
    endpoint: String,
    safe_search: bool,
    page_delay: Duration,
}

impl DuckDuckGoPager {
    pub(crate) fn new(config: &BackendConfig) -> Result<Self, SearchError> {
        Ok(Self {
            client: http::build_client(config.timeout(), None)?,
            endpoint: config.scrape_endpoint.clone(),
            safe_search: config.safe_search,
            page_delay: config.page_delay(),
        })
    }

    /// Stream at most `limit` unique hits for `query`.
    pub(crate) fn hits(&self, query: &str, limit: usize) -> BoxStream<'static, Result<Hit, SearchError>> {
        tracing::debug!(query, limit, "DuckDuckGo search");

        let mut first = vec![("q".to_owned(), query.to_owned())];
        if self.safe_search {
            first.push(("kp".to_owned(), "1".to_owned()));
        }

        let state = PagerState {
            pager: self.clone(),
            next_params: Some(first),
            pending: VecDeque::new(),
            seen_urls: HashSet::new(),
            remaining: limit,
            pages_fetched: 0,
        };

        futures::stream::unfold(state, |mut state| async move {
            loop {
                if state.remaining == 0 {
                    return None;
                }
                if let Some(hit) = state.pending.pop_front() {
                    state.remaining -= 1;
                    return Some((Ok(hit), state));
                }

                let params = state.next_params.take()?;
                if state.pages_fetched >= MAX_PAGES {
                    return None;
                }
                if state.pages_fetched > 0 && !state.pager.page_delay.is_zero() {
                    tokio::time::sleep(state.pager.page_delay).await;
                }
                state.pages_fetched += 1;

                match state.pager.fetch_page(&params).await {
                    Ok(page) => {
                        let before = state.pending.len();
                        for hit in page.hits {
                            if state.seen_urls.insert(hit.url.clone()) {
                                state.pending.push_back(hit);
                            }
                        }
                        // A page with nothing new means paging has stalled.
                        if state.pending.len() > before {
                            state.next_params = page.next;
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

    async fn fetch_page(&self, params: &[(String, String)]) -> Result<ResultPage, SearchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(params)
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout(format!("DuckDuckGo request timed out: {e}"))
                } else {
                    SearchError::Http(format!("DuckDuckGo request failed: {e}"))
                }
            })?
            .error_for_status()
            .map_err(|e| SearchError::Http(format!("DuckDuckGo HTTP error: {e}")))?;

        let html = response
            .text()
            .await
            .map_err(|e| SearchError::Http(format!("DuckDuckGo response read failed: {e}")))?;

        tracing::trace!(bytes = html.len(), "DuckDuckGo response received");

        parse_duckduckgo_html(&html)
    }
}

struct PagerState {
    pager: DuckDuckGoPager,
    next_params: Option<Vec<(String, String)>>,
    pending: VecDeque<Hit>,
    seen_urls: HashSet<String>,
    remaining: usize,
    pages_fetched: usize,
}

/// Extract the actual URL from DuckDuckGo's redirect wrapper.
///
/// DDG wraps URLs like: `//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com&rut=...`
/// We parse out the `uddg` query parameter and URL-decode it.
fn extract_url(href: &str) -> Option<String> {
    let full_href = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };

    let parsed = Url::parse(&full_href).ok()?;

    if parsed.host_str() == Some("duckduckgo.com") && parsed.path().starts_with("/l/") {
        parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, value)| value.into_owned())
    } else {
        Some(full_href)
    }
}

/// Parse a DuckDuckGo HTML response into hits and next-page parameters.
pub(crate) fn parse_duckduckgo_html(html: &str) -> Result<ResultPage, SearchError> {
    let document = Html::parse_document(html);

    let result_sel = Selector::parse(
        ".result.results_links.results_links_deep:not(.result--ad), .web-result:not(.result--ad)",
    )
    .map_err(|e| SearchError::Parse(format!("invalid result selector: {e:?}")))?;
    let title_sel = Selector::parse(".result__a")
        .map_err(|e| SearchError::Parse(format!("invalid title selector: {e:?}")))?;
    let snippet_sel = Selector::parse(".result__snippet")
        .map_err(|e| SearchError::Parse(format!("invalid snippet selector: {e:?}")))?;

    let mut hits = Vec::new();

    for element in document.select(&result_sel) {
        let Some(title_el) = element.select(&title_sel).next() else {
            continue;
        };

        let title = title_el.text().collect::<String>().trim().to_string();
        if title.is_empty() {
            continue;
        }

        let Some(url) = title_el.value().attr("href").and_then(extract_url) else {
            continue;
        };

        let snippet = element
            .select(&snippet_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        hits.push(Hit {
            title,
            url,
            snippet,
        });
    }

    let next = parse_next_params(&document)?;
    tracing::debug!(count = hits.len(), has_next = next.is_some(), "DuckDuckGo page parsed");
    Ok(ResultPage { hits, next })
}

/// Hidden form fields of the "Next" button, if the page has one.
fn parse_next_params(document: &Html) -> Result<Option<Vec<(String, String)>>, SearchError> {
    let form_sel = Selector::parse(".nav-link form")
        .map_err(|e| SearchError::Parse(format!("invalid form selector: {e:?}")))?;
    let submit_sel = Selector::parse("input[type=\"submit\"]")
        .map_err(|e| SearchError::Parse(format!("invalid submit selector: {e:?}")))?;
    let hidden_sel = Selector::parse("input[type=\"hidden\"]")
        .map_err(|e| SearchError::Parse(format!("invalid input selector: {e:?}")))?;

    for form in document.select(&form_sel) {
        let is_next = form.select(&submit_sel).any(|input| {
            input
                .value()
                .attr("value")
                .is_some_and(|value| value.to_ascii_lowercase().contains("next"))
        });
        if !is_next {
            continue;
        }
        let params = form
            .select(&hidden_sel)
            .filter_map(|input| {
                let name = input.value().attr("name")?;
                let value = input.value().attr("value").unwrap_or_default();
                Some((name.to_owned(), value.to_owned()))
            })
            .collect();
        return Ok(Some(params));
    }
    Ok(None)
}

/// Generic scrape backend: DuckDuckGo result links as bare URL candidates.
#[derive(Debug, Clone)]
pub struct ScrapeBackend {
    pager: DuckDuckGoPager,
}

impl ScrapeBackend {
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, SearchError> {
        Ok(Self {
            pager: DuckDuckGoPager::new(config)?,
        })
    }
}

impl SearchBackend for ScrapeBackend {
    fn search(&self, query: &str, limit: usize) -> CandidateStream {
        self.pager
            .hits(query, limit)
            .map(|hit| hit.map(|hit| Candidate::Url(hit.url)))
            .boxed()
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Scrape
    }
}
