//! # gleaner
//!
//! Query-time content aggregation over HTTP.
//!
//! A client posts a search phrase `q` and a count `n`; the server asks the
//! configured search backend for candidates, fetches and normalises them,
//! drops failures, empty pages, duplicates and blocked-access pages, and
//! answers with up to `n` passages as JSON. The pipeline itself lives in the
//! [`gleaner_search`] crate; this crate adds configuration, request decoding,
//! the HTTP listener and a synthetic client.

pub mod client;
pub mod config;
pub mod error;
pub mod request;
pub mod server;

pub use client::SearchClient;
pub use config::{ListenConfig, ServerConfig};
pub use error::{Result, ServerError};
pub use server::{ErrorResponse, HealthResponse, SearchServer};
