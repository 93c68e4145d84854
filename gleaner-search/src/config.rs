//! Pipeline and backend configuration with sensible defaults.
//!
//! Both structs are plain immutable values resolved once at startup and
//! shared read-only by every request. Nothing here is mutated per request.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::SearchError;
use crate::types::{ApiCategory, BackendKind};

/// Default DuckDuckGo HTML endpoint used by the scrape and description backends.
pub const DEFAULT_SCRAPE_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Default Brave Search API endpoint used by the api backend.
pub const DEFAULT_API_ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";

/// Configuration for fetching, normalising and filtering candidates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Per-page fetch timeout in seconds.
    pub fetch_timeout_secs: u64,
    /// Maximum content length in bytes per passage. `None` means no cap.
    pub max_content_bytes: Option<usize>,
    /// Drop short bullet-prefixed lines (navigation menus) from content.
    pub strip_menus: bool,
    /// Bullet lines at least this many characters long survive menu stripping.
    pub menu_line_threshold: usize,
    /// How many candidates to request from the backend per wanted result.
    pub overfetch_factor: f64,
    /// Maximum number of page fetches in flight for one request.
    pub fetch_concurrency: usize,
    /// Exact content strings that identify a blocked-access page.
    pub forbidden_sentinels: Vec<String>,
    /// Custom User-Agent string. If `None`, rotates through a built-in list
    /// of realistic browser User-Agents.
    pub user_agent: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 5,
            max_content_bytes: None,
            strip_menus: false,
            menu_line_threshold: 50,
            overfetch_factor: 2.0,
            fetch_concurrency: 4,
            forbidden_sentinels: vec!["Access Denied".into(), "403 Forbidden".into()],
            user_agent: None,
        }
    }
}

impl PipelineConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `fetch_timeout_secs` must be greater than 0
    /// - `fetch_concurrency` must be greater than 0
    /// - `overfetch_factor` must be finite and at least 1.0
    /// - `max_content_bytes`, when set, must be greater than 0
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.fetch_timeout_secs == 0 {
            return Err(SearchError::Config(
                "fetch_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.fetch_concurrency == 0 {
            return Err(SearchError::Config(
                "fetch_concurrency must be greater than 0".into(),
            ));
        }
        if !self.overfetch_factor.is_finite() || self.overfetch_factor < 1.0 {
            return Err(SearchError::Config(
                "overfetch_factor must be a number >= 1.0".into(),
            ));
        }
        if self.max_content_bytes == Some(0) {
            return Err(SearchError::Config(
                "max_content_bytes must be greater than 0 when set".into(),
            ));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Number of candidates to ask the backend for when `wanted` results are needed.
    pub fn candidate_budget(&self, wanted: usize) -> usize {
        let scaled = (wanted as f64 * self.overfetch_factor).ceil();
        if scaled.is_finite() && scaled >= wanted as f64 {
            scaled as usize
        } else {
            wanted
        }
    }
}

/// Configuration for the search backend selected at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Which backend variant serves queries.
    pub kind: BackendKind,
    /// Credential for backends that need one.
    pub api_key: Option<String>,
    /// Result categories merged by the api backend, in priority order.
    pub api_categories: Vec<ApiCategory>,
    /// HTML search endpoint for the scrape and description backends.
    pub scrape_endpoint: String,
    /// JSON search endpoint for the api backend.
    pub api_endpoint: String,
    /// Delay between consecutive result-page requests, in milliseconds.
    pub page_delay_ms: u64,
    /// Whether to request safe search filtering where supported.
    pub safe_search: bool,
    /// Search request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Scrape,
            api_key: None,
            api_categories: vec![ApiCategory::Web],
            scrape_endpoint: DEFAULT_SCRAPE_ENDPOINT.into(),
            api_endpoint: DEFAULT_API_ENDPOINT.into(),
            page_delay_ms: 1000,
            safe_search: false,
            timeout_secs: 8,
        }
    }
}

impl BackendConfig {
    /// Validates this configuration for the selected backend.
    ///
    /// A missing credential for a backend that needs one is reported here so
    /// that it surfaces at startup rather than on the first request.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.timeout_secs == 0 {
            return Err(SearchError::Config(
                "backend timeout_secs must be greater than 0".into(),
            ));
        }
        if self.kind.requires_api_key() && self.api_key().is_none() {
            return Err(SearchError::Config(format!(
                "the {} backend requires an API key",
                self.kind
            )));
        }
        match self.kind {
            BackendKind::Api => {
                if self.api_categories.is_empty() {
                    return Err(SearchError::Config(
                        "at least one api category must be enabled".into(),
                    ));
                }
                parse_endpoint(&self.api_endpoint)?;
            }
            BackendKind::Scrape | BackendKind::Description => {
                parse_endpoint(&self.scrape_endpoint)?;
            }
        }
        Ok(())
    }

    /// The configured API key, ignoring blank values.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

fn parse_endpoint(endpoint: &str) -> Result<url::Url, SearchError> {
    url::Url::parse(endpoint)
        .map_err(|e| SearchError::Config(format!("invalid endpoint `{endpoint}`: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pipeline_config_has_sensible_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.fetch_timeout_secs, 5);
        assert!(config.max_content_bytes.is_none());
        assert!(!config.strip_menus);
        assert_eq!(config.menu_line_threshold, 50);
        assert!((config.overfetch_factor - 2.0).abs() < f64::EPSILON);
        assert!(config.user_agent.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_fetch_timeout_rejected() {
        let config = PipelineConfig {
            fetch_timeout_secs: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("fetch_timeout_secs"));
    }

    #[test]
    fn zero_concurrency_rejected() {
        let config = PipelineConfig {
            fetch_concurrency: 0,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("concurrency"));
    }

    #[test]
    fn overfetch_below_one_rejected() {
        let config = PipelineConfig {
            overfetch_factor: 0.5,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("overfetch"));

        let config = PipelineConfig {
            overfetch_factor: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_byte_cap_rejected() {
        let config = PipelineConfig {
            max_content_bytes: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn candidate_budget_scales_and_rounds_up() {
        let config = PipelineConfig {
            overfetch_factor: 1.5,
            ..Default::default()
        };
        assert_eq!(config.candidate_budget(3), 5);
        assert_eq!(config.candidate_budget(0), 0);

        let exact = PipelineConfig {
            overfetch_factor: 1.0,
            ..Default::default()
        };
        assert_eq!(exact.candidate_budget(7), 7);
    }

    #[test]
    fn default_backend_is_scrape_and_valid() {
        let config = BackendConfig::default();
        assert_eq!(config.kind, BackendKind::Scrape);
        assert_eq!(config.page_delay_ms, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn api_backend_without_key_rejected() {
        let config = BackendConfig {
            kind: BackendKind::Api,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("API key"));

        let blank = BackendConfig {
            kind: BackendKind::Api,
            api_key: Some("   ".into()),
            ..Default::default()
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn api_backend_with_key_valid() {
        let config = BackendConfig {
            kind: BackendKind::Api,
            api_key: Some("secret".into()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.api_key(), Some("secret"));
    }

    #[test]
    fn api_backend_without_categories_rejected() {
        let config = BackendConfig {
            kind: BackendKind::Api,
            api_key: Some("secret".into()),
            api_categories: vec![],
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("category"));
    }

    #[test]
    fn invalid_endpoint_rejected() {
        let config = BackendConfig {
            scrape_endpoint: "not a url".into(),
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("endpoint"));
    }
}
