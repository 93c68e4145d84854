//! Core types: queries, candidates, passages and backend identification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FetchFailure;

/// A single incoming search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// The search phrase.
    pub text: String,
    /// How many passages the caller wants back.
    pub count: usize,
}

impl Query {
    pub fn new(text: impl Into<String>, count: usize) -> Self {
        Self {
            text: text.into(),
            count,
        }
    }
}

/// A normalised content record: what a fetched page or a pre-rendered
/// backend item reduces to, and what the wire response carries.
///
/// Field order matches the JSON response (`url`, `title`, `content`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    /// The page the content came from.
    pub url: String,
    /// Page title, empty when the page has none.
    pub title: String,
    /// Flattened plain-text content.
    pub content: String,
}

impl Passage {
    pub fn new(url: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            content: content.into(),
        }
    }
}

/// A pre-rendered item supplied by a backend that summarises results itself.
pub type ContentItem = Passage;

/// Outcome of fetching and normalising one URL.
pub type FetchResult = std::result::Result<Passage, FetchFailure>;

/// A not-yet-validated unit of potential result content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    /// A bare URL that still has to be fetched.
    Url(String),
    /// An item whose title and content the backend already provided.
    Item(ContentItem),
}

impl Candidate {
    /// The URL this candidate points at.
    pub fn url(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Item(item) => &item.url,
        }
    }
}

/// Why a candidate was left out of the accepted set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The fetch failed (transport, timeout, status).
    EmptyResponse,
    /// Normalisation left no content.
    ContentEmpty,
    /// Content is byte-identical to an already accepted passage.
    AlreadySeenContent,
    /// Content is a known blocked-access page.
    ContentForbidden,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyResponse => "empty_response",
            Self::ContentEmpty => "content_empty",
            Self::AlreadySeenContent => "already_seen_content",
            Self::ContentForbidden => "content_forbidden",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported search backend variants, selected once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Scrapes a public search engine's HTML results for URLs.
    Scrape,
    /// Hosted JSON search API with structured result categories. Needs a key.
    Api,
    /// Uses the search engine's own result descriptions as content.
    Description,
}

impl BackendKind {
    /// Returns the configuration name of this backend.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Scrape => "scrape",
            Self::Api => "api",
            Self::Description => "description",
        }
    }

    /// Whether this backend cannot run without a credential.
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::Api)
    }

    /// Returns all available backend variants.
    pub fn all() -> &'static [BackendKind] {
        &[Self::Scrape, Self::Api, Self::Description]
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown backend `{s}` (expected scrape, api or description)"))
    }
}

/// Result categories offered by the hosted search API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiCategory {
    Web,
    News,
    Discussions,
    Videos,
}

impl ApiCategory {
    /// The category name as used in the API's `result_filter` parameter.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::News => "news",
            Self::Discussions => "discussions",
            Self::Videos => "videos",
        }
    }
}

impl fmt::Display for ApiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
