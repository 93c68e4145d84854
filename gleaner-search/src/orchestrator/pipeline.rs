//! Query-to-response pipeline: backend stream, aggregation, assembly.

use std::time::Instant;

use crate::backend::{Backend, SearchBackend};
use crate::config::{BackendConfig, PipelineConfig};
use crate::error::Result;
use crate::fetch::{HttpFetcher, PageFetcher};
use crate::types::Query;

use super::aggregate::ResultAggregator;
use super::assemble::{assemble, SearchResponse};

/// Everything needed to answer queries, built once and shared across requests.
#[derive(Debug)]
pub struct Pipeline<B, F> {
    backend: B,
    fetcher: F,
    config: PipelineConfig,
}

impl Pipeline<Backend, HttpFetcher> {
    /// Build the production pipeline from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`](crate::SearchError::Config) if either
    /// configuration is invalid (for example the api backend has no key).
    pub fn from_config(pipeline: PipelineConfig, backend: &BackendConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(&pipeline)?;
        let backend = Backend::from_config(backend)?;
        Self::new(backend, fetcher, pipeline)
    }
}

impl<B: SearchBackend, F: PageFetcher> Pipeline<B, F> {
    /// # Errors
    ///
    /// Returns [`SearchError::Config`](crate::SearchError::Config) if `config`
    /// fails validation.
    pub fn new(backend: B, fetcher: F, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            backend,
            fetcher,
            config,
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Answer one query with at most `query.count` passages.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if it fails before producing any
    /// candidate. Per-candidate failures are never errors.
    pub async fn answer(&self, query: &Query) -> Result<SearchResponse> {
        if query.count == 0 {
            return Ok(SearchResponse::default());
        }

        let started = Instant::now();
        let budget = self.config.candidate_budget(query.count);
        tracing::debug!(query = %query.text, n = query.count, budget, "query received");

        let candidates = self.backend.search(&query.text, budget);
        let aggregation = ResultAggregator::new(&self.fetcher, &self.config, self.backend.forbidden_sentinels())
            .run(candidates, query.count)
            .await?;

        let stats = &aggregation.stats;
        tracing::info!(
            backend = %self.backend.kind(),
            accepted = stats.accepted,
            rejected = stats.rejected,
            consumed = stats.candidates_consumed,
            fetched = stats.fetches_started,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "query answered"
        );

        Ok(assemble(aggregation.accepted, query.count))
    }
}
