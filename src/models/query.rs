// src/models/query.rs

//! Validated search query input.

use chrono::NaiveDate;

use crate::error::{AppError, Result};

/// Caller-supplied constraints for one aggregation run.
#[derive(Debug, Clone)]
pub struct ResultQuery {
    /// Target sailor name (required, matched case-insensitively)
    pub sailor_name: String,

    /// Inclusive lower bound on the event date
    pub start_date: Option<NaiveDate>,

    /// Inclusive upper bound on the event date
    pub end_date: Option<NaiveDate>,

    /// Cap on records collected before matching, in arrival order
    pub max_results: usize,

    /// Case-insensitive substring filter on the regatta name
    pub name_contains: Option<String>,

    /// Seconds to wait for the dynamic source's results to render
    pub timeout_secs: u64,

    /// Drop records whose event date could not be parsed
    pub exclude_undated: bool,
}

impl ResultQuery {
    pub const DEFAULT_MAX_RESULTS: usize = 250;
    pub const DEFAULT_TIMEOUT_SECS: u64 = 12;

    /// Create a query for a sailor with default constraints.
    pub fn new(sailor_name: impl Into<String>) -> Self {
        Self {
            sailor_name: sailor_name.into(),
            start_date: None,
            end_date: None,
            max_results: Self::DEFAULT_MAX_RESULTS,
            name_contains: None,
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
            exclude_undated: false,
        }
    }

    /// Reject malformed input. Runs before any network access; a
    /// violation here is a caller error and fails the run immediately.
    pub fn validate(&self) -> Result<()> {
        if self.sailor_name.trim().is_empty() {
            return Err(AppError::invalid_query("sailor_name must not be empty"));
        }
        if self.max_results == 0 {
            return Err(AppError::invalid_query("max_results must be > 0"));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::invalid_query("timeout_secs must be > 0"));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(AppError::invalid_query(format!(
                    "end_date {end} is before start_date {start}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_query_is_valid() {
        assert!(ResultQuery::new("Jane Doe").validate().is_ok());
    }

    #[test]
    fn rejects_blank_name() {
        assert!(ResultQuery::new("   ").validate().is_err());
    }

    #[test]
    fn rejects_zero_cap_and_timeout() {
        let mut query = ResultQuery::new("Jane Doe");
        query.max_results = 0;
        assert!(query.validate().is_err());

        let mut query = ResultQuery::new("Jane Doe");
        query.timeout_secs = 0;
        assert!(query.validate().is_err());
    }

    #[test]
    fn rejects_inverted_date_window() {
        let mut query = ResultQuery::new("Jane Doe");
        query.start_date = NaiveDate::from_ymd_opt(2024, 6, 1);
        query.end_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        assert!(query.validate().is_err());
    }

    #[test]
    fn accepts_equal_bounds() {
        let mut query = ResultQuery::new("Jane Doe");
        query.start_date = NaiveDate::from_ymd_opt(2024, 6, 1);
        query.end_date = NaiveDate::from_ymd_opt(2024, 6, 1);
        assert!(query.validate().is_ok());
    }
}
