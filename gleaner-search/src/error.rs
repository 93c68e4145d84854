//! Error types for the gleaner-search crate.
//!
//! [`SearchError`] covers failures that reach the caller (configuration and
//! backend errors). [`FetchFailure`] describes why a single page could not be
//! retrieved; it never escapes the aggregator, which turns it into a rejection.

/// Errors that can occur while searching or configuring the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// An HTTP request to a search backend failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A search backend did not answer in time.
    #[error("search timed out: {0}")]
    Timeout(String),

    /// Failed to parse a search backend response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid pipeline or backend configuration.
    #[error("config error: {0}")]
    Config(String),

    /// The search backend rejected or could not serve the query.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Convenience type alias for gleaner-search results.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Why a single page fetch produced no usable body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchFailure {
    /// Connection, TLS or redirect failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request exceeded the configured fetch timeout.
    #[error("timed out after {0}s")]
    Timeout(u64),

    /// The server answered with a non-2xx status.
    #[error("HTTP status {0}")]
    Status(u16),

    /// The response body could not be read.
    #[error("body read failed: {0}")]
    Body(String),

    /// Only http and https URLs are fetched.
    #[error("unsupported URL: {0}")]
    UnsupportedScheme(String),

    /// The response is not a text document.
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_http() {
        let err = SearchError::Http("connection refused".into());
        assert_eq!(err.to_string(), "HTTP error: connection refused");
    }

    #[test]
    fn display_timeout() {
        let err = SearchError::Timeout("exceeded 8s limit".into());
        assert_eq!(err.to_string(), "search timed out: exceeded 8s limit");
    }

    #[test]
    fn display_config() {
        let err = SearchError::Config("fetch_timeout_secs must be > 0".into());
        assert_eq!(err.to_string(), "config error: fetch_timeout_secs must be > 0");
    }

    #[test]
    fn display_backend() {
        let err = SearchError::Backend("missing API key".into());
        assert_eq!(err.to_string(), "backend error: missing API key");
    }

    #[test]
    fn display_fetch_failures() {
        assert_eq!(FetchFailure::Status(404).to_string(), "HTTP status 404");
        assert_eq!(FetchFailure::Timeout(5).to_string(), "timed out after 5s");
        assert_eq!(
            FetchFailure::UnsupportedContentType("image/png".into()).to_string(),
            "unsupported content type: image/png"
        );
        assert_eq!(
            FetchFailure::UnsupportedScheme("ftp://x".into()).to_string(),
            "unsupported URL: ftp://x"
        );
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SearchError>();
        assert_send_sync::<FetchFailure>();
    }
}
