//! HTTP front end for the aggregation pipeline.
//!
//! ## Endpoints
//!
//! - `POST /`: form body with `q` and `n`, answers `{"response": [...]}`
//! - `GET /health`: liveness plus the configured backend kind

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use gleaner_search::{Backend, HttpFetcher, Pipeline, SearchBackend, SearchError};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::{ListenConfig, ServerConfig};
use crate::error::{Result, ServerError};
use crate::request;

/// The production pipeline the server drives.
pub type ServerPipeline = Pipeline<Backend, HttpFetcher>;

/// Body of every non-200 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub backend: String,
}

/// Shared state for axum handlers.
#[derive(Clone)]
struct AppState {
    pipeline: Arc<ServerPipeline>,
    max_results: usize,
}

/// Search aggregation server running in a background task.
pub struct SearchServer {
    /// The address the server is listening on.
    addr: SocketAddr,
    /// Handle to the background server task.
    handle: JoinHandle<()>,
}

impl SearchServer {
    /// Validate `config`, build the pipeline and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid (including a missing
    /// API key for the api backend) or the listener cannot bind.
    pub async fn start(config: &ServerConfig) -> Result<Self> {
        config.validate()?;
        let pipeline = Pipeline::from_config(config.pipeline.clone(), &config.backend)?;
        Self::start_with_pipeline(pipeline, &config.server).await
    }

    /// Start serving an already built pipeline.
    ///
    /// Binds to `{listen.host}:{listen.port}` (use port `0` for auto-assign).
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the TCP listener cannot bind.
    pub async fn start_with_pipeline(pipeline: ServerPipeline, listen: &ListenConfig) -> Result<Self> {
        let state = AppState {
            pipeline: Arc::new(pipeline),
            max_results: listen.max_results,
        };
        let app = router(state);

        let bind_addr = listen.bind_addr();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| ServerError::Bind(format!("{bind_addr}: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| ServerError::Bind(format!("failed to get local addr: {e}")))?;

        info!("search server listening on http://{addr}/");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("search server error: {e}");
            }
        });

        Ok(Self { addr, handle })
    }

    /// Returns the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Base URL for clients, e.g. `http://127.0.0.1:8080`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Abort the server task.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for SearchServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(handle_search))
        .route("/health", get(handle_health))
        .with_state(state)
}

/// HTTP status for an error surfaced by a request.
fn status_for(err: &ServerError) -> StatusCode {
    match err {
        ServerError::Request(_) => StatusCode::BAD_REQUEST,
        ServerError::Search(SearchError::Config(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        ServerError::Search(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &ServerError) -> Response {
    let body = ErrorResponse {
        error: err.to_string(),
    };
    (status_for(err), Json(body)).into_response()
}

/// `POST /`: run one query through the pipeline.
async fn handle_search(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    let query = match request::parse_form(content_type, &body, state.max_results) {
        Ok(query) => query,
        Err(e) => {
            tracing::warn!(error = %e, "rejected malformed request");
            return error_response(&e);
        }
    };

    match state.pipeline.answer(&query).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "search failed");
            error_response(&ServerError::from(e))
        }
    }
}

/// `GET /health`: liveness check.
async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_owned(),
        backend: state.pipeline.backend().kind().to_string(),
    })
}
