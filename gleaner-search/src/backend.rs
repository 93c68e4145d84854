//! Trait definition for pluggable search backends.
//!
//! A backend turns a query into a lazy [`CandidateStream`]. Nothing touches
//! the network until the stream is polled, and dropping the stream stops any
//! further result-page requests, so the aggregator can stop pulling early.

use futures::stream::BoxStream;

use crate::backends::{ApiBackend, DescriptionBackend, ScrapeBackend};
use crate::config::BackendConfig;
use crate::error::SearchError;
use crate::types::{BackendKind, Candidate};

/// Lazy, partially consumable sequence of candidates.
///
/// An `Err` item means the backend could not produce more candidates (for
/// example the next result page failed to load); streams end after yielding
/// one.
pub type CandidateStream = BoxStream<'static, Result<Candidate, SearchError>>;

/// A pluggable search backend.
///
/// Implementors handle their own:
///
/// - URL construction with query encoding
/// - HTTP requests with appropriate headers and credentials
/// - Response parsing
/// - Paging, requested lazily as the stream is consumed
///
/// All implementations must be `Send + Sync` so one instance can serve
/// concurrent requests.
pub trait SearchBackend: Send + Sync {
    /// Start a search for `query`, producing at most `limit` candidates.
    ///
    /// `limit` is a count hint: callers pass more than they need to make up
    /// for candidates that will be rejected.
    fn search(&self, query: &str, limit: usize) -> CandidateStream;

    /// Returns which [`BackendKind`] this implementation represents.
    fn kind(&self) -> BackendKind;

    /// Content strings this backend knows to be blocked-access pages.
    fn forbidden_sentinels(&self) -> &[String] {
        &[]
    }
}

/// The backend selected at startup, dispatching to the concrete variant.
#[derive(Debug, Clone)]
pub enum Backend {
    Scrape(ScrapeBackend),
    Api(ApiBackend),
    Description(DescriptionBackend),
}

impl Backend {
    /// Validate `config` and build the backend it selects.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the configuration is invalid, most
    /// notably when the api backend has no API key.
    pub fn from_config(config: &BackendConfig) -> Result<Self, SearchError> {
        config.validate()?;
        let backend = match config.kind {
            BackendKind::Scrape => Self::Scrape(ScrapeBackend::new(config)?),
            BackendKind::Api => Self::Api(ApiBackend::new(config)?),
            BackendKind::Description => Self::Description(DescriptionBackend::new(config)?),
        };
        tracing::info!(backend = %config.kind, "search backend ready");
        Ok(backend)
    }
}

impl SearchBackend for Backend {
    fn search(&self, query: &str, limit: usize) -> CandidateStream {
        match self {
            Self::Scrape(backend) => backend.search(query, limit),
            Self::Api(backend) => backend.search(query, limit),
            Self::Description(backend) => backend.search(query, limit),
        }
    }

    fn kind(&self) -> BackendKind {
        match self {
            Self::Scrape(backend) => backend.kind(),
            Self::Api(backend) => backend.kind(),
            Self::Description(backend) => backend.kind(),
        }
    }

    fn forbidden_sentinels(&self) -> &[String] {
        match self {
            Self::Scrape(backend) => backend.forbidden_sentinels(),
            Self::Api(backend) => backend.forbidden_sentinels(),
            Self::Description(backend) => backend.forbidden_sentinels(),
        }
    }
}
