// src/models/config.rs

//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP client behavior settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Run-wide budget settings
    #[serde(default)]
    pub run: RunConfig,

    /// Static-HTML source settings
    #[serde(default)]
    pub source_a: SourceAConfig,

    /// Dynamic (browser-automated) source settings
    #[serde(default)]
    pub source_b: SourceBConfig,

    /// Cross-source matcher thresholds
    #[serde(default)]
    pub matcher: MatcherConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::config("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::config("http.timeout_secs must be > 0"));
        }
        if self.run.budget_secs == 0 {
            return Err(AppError::config("run.budget_secs must be > 0"));
        }
        if self.source_a.base_url.trim().is_empty() {
            return Err(AppError::config("source_a.base_url is empty"));
        }
        if self.source_b.api_url.trim().is_empty() {
            return Err(AppError::config("source_b.api_url is empty"));
        }
        if !self.source_b.results_url_template.contains("{id}") {
            return Err(AppError::config(
                "source_b.results_url_template must contain an {id} placeholder",
            ));
        }
        if self.source_b.webdriver_url.trim().is_empty() {
            return Err(AppError::config("source_b.webdriver_url is empty"));
        }
        if self.source_b.max_scroll_passes == 0 {
            return Err(AppError::config("source_b.max_scroll_passes must be > 0"));
        }
        for (name, value) in [
            ("matcher.name_threshold", self.matcher.name_threshold),
            (
                "matcher.undated_name_threshold",
                self.matcher.undated_name_threshold,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AppError::config(format!("{name} must be within 0..=1")));
            }
        }
        if self.matcher.undated_name_threshold < self.matcher.name_threshold {
            return Err(AppError::config(
                "matcher.undated_name_threshold must be at least matcher.name_threshold",
            ));
        }
        Ok(())
    }
}

/// HTTP client behavior settings, shared by both sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Extra attempts for a source's initial page before giving up on it
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            max_retries: defaults::max_retries(),
        }
    }
}

/// Run-wide wall-clock budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Overall budget in seconds; adapters return partial results on expiry
    #[serde(default = "defaults::budget")]
    pub budget_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            budget_secs: defaults::budget(),
        }
    }
}

/// Static-HTML source: sailor participation pages with pagination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceAConfig {
    /// Sailor page prefix; the sailor slug is appended
    #[serde(default = "defaults::source_a_base_url")]
    pub base_url: String,

    /// CSS selector for participation tables
    #[serde(default = "defaults::source_a_table_selector")]
    pub table_selector: String,

    /// CSS selector for result rows within a table
    #[serde(default = "defaults::source_a_row_selector")]
    pub row_selector: String,

    /// CSS selector for the regatta-name cell
    #[serde(default = "defaults::source_a_regatta_selector")]
    pub regatta_selector: String,

    /// CSS selector for the date cell
    #[serde(default = "defaults::source_a_date_selector")]
    pub date_selector: String,

    /// CSS selector for the placement/result cell
    #[serde(default = "defaults::source_a_result_selector")]
    pub result_selector: String,

    /// CSS selector for the next-page link
    #[serde(default = "defaults::source_a_next_page_selector")]
    pub next_page_selector: String,
}

impl Default for SourceAConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::source_a_base_url(),
            table_selector: defaults::source_a_table_selector(),
            row_selector: defaults::source_a_row_selector(),
            regatta_selector: defaults::source_a_regatta_selector(),
            date_selector: defaults::source_a_date_selector(),
            result_selector: defaults::source_a_result_selector(),
            next_page_selector: defaults::source_a_next_page_selector(),
        }
    }
}

/// Dynamic source: JSON regatta listing plus browser-rendered results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceBConfig {
    /// Regatta listing API endpoint
    #[serde(default = "defaults::source_b_api_url")]
    pub api_url: String,

    /// Application id the listing API expects
    #[serde(default = "defaults::source_b_app_id")]
    pub app_id: String,

    /// Maximum listing entries to request
    #[serde(default = "defaults::source_b_listing_limit")]
    pub listing_limit: u32,

    /// Results page URL with an {id} placeholder
    #[serde(default = "defaults::source_b_results_url_template")]
    pub results_url_template: String,

    /// WebDriver endpoint for the headless browser session
    #[serde(default = "defaults::source_b_webdriver_url")]
    pub webdriver_url: String,

    /// Delay between render polls and scroll passes in milliseconds
    #[serde(default = "defaults::source_b_poll_interval")]
    pub poll_interval_ms: u64,

    /// Scroll passes used to force lazy rows to render
    #[serde(default = "defaults::source_b_max_scroll_passes")]
    pub max_scroll_passes: u32,
}

impl Default for SourceBConfig {
    fn default() -> Self {
        Self {
            api_url: defaults::source_b_api_url(),
            app_id: defaults::source_b_app_id(),
            listing_limit: defaults::source_b_listing_limit(),
            results_url_template: defaults::source_b_results_url_template(),
            webdriver_url: defaults::source_b_webdriver_url(),
            poll_interval_ms: defaults::source_b_poll_interval(),
            max_scroll_passes: defaults::source_b_max_scroll_passes(),
        }
    }
}

/// Cross-source matcher thresholds.
///
/// The original system left these implicit in scraper logic; they are
/// surfaced here as configuration (see DESIGN.md).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Minimum name similarity when both records carry a date
    #[serde(default = "defaults::name_threshold")]
    pub name_threshold: f64,

    /// Stricter minimum when either record lacks a date
    #[serde(default = "defaults::undated_name_threshold")]
    pub undated_name_threshold: f64,

    /// Bonus added when both records report the same placement
    #[serde(default = "defaults::place_bonus")]
    pub place_bonus: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            name_threshold: defaults::name_threshold(),
            undated_name_threshold: defaults::undated_name_threshold(),
            place_bonus: defaults::place_bonus(),
        }
    }
}

mod defaults {
    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; RegattaResume/1.0)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        100
    }
    pub fn max_retries() -> u32 {
        2
    }

    // Run defaults
    pub fn budget() -> u64 {
        120
    }

    // Static source defaults
    pub fn source_a_base_url() -> String {
        "https://scores.hssailing.org/sailors/".into()
    }
    pub fn source_a_table_selector() -> String {
        "table.participation-table".into()
    }
    pub fn source_a_row_selector() -> String {
        "tbody tr.row0, tbody tr.row1".into()
    }
    pub fn source_a_regatta_selector() -> String {
        "td:first-child".into()
    }
    pub fn source_a_date_selector() -> String {
        "td:nth-last-child(3)".into()
    }
    pub fn source_a_result_selector() -> String {
        "td:last-child".into()
    }
    pub fn source_a_next_page_selector() -> String {
        "a[rel='next']".into()
    }

    // Dynamic source defaults
    pub fn source_b_api_url() -> String {
        "https://theclubspot.com/parse/classes/regattas".into()
    }
    pub fn source_b_app_id() -> String {
        "myclubspot2017".into()
    }
    pub fn source_b_listing_limit() -> u32 {
        15000
    }
    pub fn source_b_results_url_template() -> String {
        "https://theclubspot.com/regatta/{id}/results".into()
    }
    pub fn source_b_webdriver_url() -> String {
        "http://localhost:9515".into()
    }
    pub fn source_b_poll_interval() -> u64 {
        250
    }
    pub fn source_b_max_scroll_passes() -> u32 {
        16
    }

    // Matcher defaults
    pub fn name_threshold() -> f64 {
        0.90
    }
    pub fn undated_name_threshold() -> f64 {
        0.96
    }
    pub fn place_bonus() -> f64 {
        0.02
    }
}
