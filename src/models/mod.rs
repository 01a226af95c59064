// src/models/mod.rs

//! Domain models for the aggregator.
//!
//! This module contains all data structures used throughout the
//! application, organized by their primary purpose.

mod config;
mod query;
mod record;

// Re-export all public types
pub use config::{Config, HttpConfig, MatcherConfig, RunConfig, SourceAConfig, SourceBConfig};
pub use query::ResultQuery;
pub use record::{CanonicalRecord, MatchGroup, RawRow, Source};
