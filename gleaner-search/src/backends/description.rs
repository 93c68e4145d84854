//! Description-only backend: search result snippets become the content.
//!
//! No page is ever fetched. Each DuckDuckGo hit is turned into a
//! pre-rendered [`ContentItem`](crate::types::ContentItem) whose content is
//! the engine's own description of the page.

use futures::StreamExt;

use super::scrape::DuckDuckGoPager;
use crate::backend::{CandidateStream, SearchBackend};
use crate::config::BackendConfig;
use crate::error::SearchError;
use crate::normalize::{clean_title, normalize_plain, unescape};
use crate::types::{BackendKind, Candidate, Passage};

#[derive(Debug, Clone)]
pub struct DescriptionBackend {
    pager: DuckDuckGoPager,
}

impl DescriptionBackend {
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, SearchError> {
        Ok(Self {
            pager: DuckDuckGoPager::new(config)?,
        })
    }
}

impl SearchBackend for DescriptionBackend {
    fn search(&self, query: &str, limit: usize) -> CandidateStream {
        self.pager
            .hits(query, limit)
            .map(|hit| {
                hit.map(|hit| {
                    Candidate::Item(Passage {
                        url: hit.url,
                        title: clean_title(&hit.title),
                        content: normalize_plain(&unescape(&hit.snippet)),
                    })
                })
            })
            .boxed()
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Description
    }
}
