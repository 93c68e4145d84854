//! Query orchestration: candidate aggregation, rejection policy, assembly.
//!
//! This module pulls candidates from a backend stream, fetches and filters
//! them until enough passages are accepted, and assembles the wire response.

pub mod aggregate;
pub mod assemble;
pub mod filter;
pub mod pipeline;
