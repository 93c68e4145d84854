//! Error types for the gleaner server.

use gleaner_search::SearchError;

/// Top-level error type for the server, its configuration and the client.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Malformed search request.
    #[error("bad request: {0}")]
    Request(String),

    /// Error from the search pipeline.
    #[error(transparent)]
    Search(#[from] SearchError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The listener could not be bound.
    #[error("bind error: {0}")]
    Bind(String),

    /// The synthetic client could not complete a request.
    #[error("client error: {0}")]
    Client(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ServerError>;
