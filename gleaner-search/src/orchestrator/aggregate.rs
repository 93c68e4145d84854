//! The result aggregator: pulls candidates, fetches, filters, accepts.
//!
//! One [`ResultAggregator`] serves exactly one request. It pulls from the
//! backend's lazy stream only while more results are needed, keeps at most
//! `min(fetch_concurrency, wanted - accepted)` fetches in flight, and decides
//! on results strictly in candidate order.

use std::collections::HashSet;

use futures::stream::FuturesOrdered;
use futures::StreamExt;
use serde::Serialize;

use crate::backend::CandidateStream;
use crate::config::PipelineConfig;
use crate::error::SearchError;
use crate::fetch::PageFetcher;
use crate::normalize::ContentPolicy;
use crate::types::{Candidate, FetchResult, Passage};

use super::filter::{join_reasons, rejection_reasons};

/// Counters describing one aggregation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregationStats {
    /// Candidates pulled from the backend stream.
    pub candidates_consumed: usize,
    /// URL candidates handed to the fetcher.
    pub fetches_started: usize,
    pub accepted: usize,
    pub rejected: usize,
    /// Error that ended the candidate stream early, if any.
    pub backend_error: Option<String>,
}

/// Accepted passages in acceptance order, plus run statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregation {
    pub accepted: Vec<Passage>,
    pub stats: AggregationStats,
}

/// Request-scoped aggregation state.
pub struct ResultAggregator<'a, F> {
    fetcher: &'a F,
    policy: ContentPolicy,
    concurrency: usize,
    sentinels: Vec<String>,
    accepted: Vec<Passage>,
    seen: HashSet<String>,
    stats: AggregationStats,
}

impl<'a, F: PageFetcher> ResultAggregator<'a, F> {
    /// Create an aggregator using `config`'s content policy, concurrency and
    /// sentinels, extended with the backend's own `extra_sentinels`.
    pub fn new(fetcher: &'a F, config: &PipelineConfig, extra_sentinels: &[String]) -> Self {
        let mut sentinels = config.forbidden_sentinels.clone();
        sentinels.extend(extra_sentinels.iter().cloned());
        Self {
            fetcher,
            policy: ContentPolicy::from(config),
            concurrency: config.fetch_concurrency.max(1),
            sentinels,
            accepted: Vec::new(),
            seen: HashSet::new(),
            stats: AggregationStats::default(),
        }
    }

    /// Consume `candidates` until `wanted` passages are accepted or the
    /// stream ends.
    ///
    /// Running out of candidates is not an error: the partial result is
    /// returned. Outstanding fetches are dropped once `wanted` is reached.
    ///
    /// # Errors
    ///
    /// Returns the backend's error only if the stream fails before yielding
    /// any candidate. Later stream errors end the run with what was accepted.
    pub async fn run(mut self, mut candidates: CandidateStream, wanted: usize) -> Result<Aggregation, SearchError> {
        let mut in_flight = FuturesOrdered::new();
        let mut exhausted = false;

        while self.accepted.len() < wanted {
            let needed = wanted - self.accepted.len();
            while !exhausted && in_flight.len() < self.concurrency.min(needed) {
                match candidates.next().await {
                    Some(Ok(candidate)) => {
                        self.stats.candidates_consumed += 1;
                        if matches!(candidate, Candidate::Url(_)) {
                            self.stats.fetches_started += 1;
                        }
                        in_flight.push_back(resolve(self.fetcher, candidate));
                    }
                    Some(Err(err)) => {
                        exhausted = true;
                        if self.stats.candidates_consumed == 0 {
                            tracing::warn!(error = %err, "search backend failed");
                            return Err(err);
                        }
                        tracing::warn!(
                            error = %err,
                            consumed = self.stats.candidates_consumed,
                            "candidate stream ended early"
                        );
                        self.stats.backend_error = Some(err.to_string());
                    }
                    None => exhausted = true,
                }
            }

            let Some((url, outcome)) = in_flight.next().await else {
                break;
            };
            self.decide(url, outcome);
        }

        if self.accepted.len() < wanted {
            tracing::debug!(
                accepted = self.accepted.len(),
                wanted,
                "candidates exhausted before enough passages were accepted"
            );
        }

        self.stats.accepted = self.accepted.len();
        Ok(Aggregation {
            accepted: self.accepted,
            stats: self.stats,
        })
    }

    fn decide(&mut self, url: String, outcome: FetchResult) {
        let outcome = outcome.map(|mut page| {
            page.content = self.policy.apply(&page.content);
            page
        });
        let reasons = rejection_reasons(&outcome, &self.seen, &self.sentinels);

        match outcome {
            Ok(page) if reasons.is_empty() => {
                tracing::info!(
                    url = %page.url,
                    title = %page.title,
                    accepted = self.accepted.len() + 1,
                    "accepted"
                );
                self.seen.insert(page.content.clone());
                self.accepted.push(page);
            }
            Ok(_) => {
                self.stats.rejected += 1;
                tracing::info!(url, reasons = %join_reasons(&reasons), "rejected");
            }
            Err(failure) => {
                self.stats.rejected += 1;
                tracing::info!(
                    url,
                    reasons = %join_reasons(&reasons),
                    failure = %failure,
                    "rejected"
                );
            }
        }
    }
}

/// Turn a candidate into a fetch outcome. Pre-rendered items skip the fetcher.
async fn resolve<F: PageFetcher>(fetcher: &F, candidate: Candidate) -> (String, FetchResult) {
    match candidate {
        Candidate::Url(url) => {
            let outcome = fetcher.fetch(&url).await;
            (url, outcome)
        }
        Candidate::Item(item) => (item.url.clone(), Ok(item)),
    }
}
