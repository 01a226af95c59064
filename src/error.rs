// src/error.rs

//! Unified error handling for the aggregator.

use thiserror::Error;

use crate::models::Source;

/// Result type alias for aggregator operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
///
/// Only `InvalidQuery` (and configuration failures before a run starts)
/// abort a run; per-source failures are downgraded to warnings by the
/// orchestrator and the run continues with fewer records.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed query input, rejected before any network access
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Initial connection to a source failed
    #[error("source {source} unavailable: {message}")]
    SourceUnavailable { source: Source, message: String },

    /// The dynamic source never rendered its results table
    #[error("source {source} timed out after {secs}s waiting for results")]
    ScrapeTimeout { source: Source, secs: u64 },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// WebDriver session could not be established
    #[error("WebDriver session error: {0}")]
    Session(#[from] fantoccini::error::NewSessionError),

    /// WebDriver command failed mid-session
    #[error("WebDriver command error: {0}")]
    WebDriver(#[from] fantoccini::error::CmdError),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an invalid-query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery(message.into())
    }

    /// Create a source-unavailable error.
    pub fn source_unavailable(source: Source, message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            source,
            message: message.into(),
        }
    }

    /// Create a scrape-timeout error.
    pub fn scrape_timeout(source: Source, secs: u64) -> Self {
        Self::ScrapeTimeout { source, secs }
    }
}
