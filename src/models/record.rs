// src/models/record.rs

//! Canonical result records and match groups.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::utils;

/// Identifies which adapter produced a record.
///
/// The ordering of the variants is the matcher's final survivor
/// tie-break, so declaration order is load-bearing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    SourceA,
    SourceB,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::SourceA => "source-a",
            Source::SourceB => "source-b",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// `Source` is used in fields named `source` on `AppError` variants, which
// thiserror treats as an error source requiring `std::error::Error`.
impl std::error::Error for Source {}

/// Raw scraped field bag, exactly as an adapter saw it.
///
/// Never leaves the adapter/normalizer boundary; downstream code only
/// sees [`CanonicalRecord`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    fields: BTreeMap<String, String>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// One normalized result row, the unit of truth downstream.
///
/// Created once by the normalizer and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub source: Source,

    /// Sailor name as queried, not re-derived from the page
    pub sailor_name: String,

    /// Trimmed, case-preserved regatta name
    pub regatta_name: String,

    /// Event date; `None` when the source could not supply one
    pub event_date: Option<NaiveDate>,

    /// Ordinal placement; `None` for text-only results
    pub place: Option<u32>,

    /// Free-form result description (fleet, division, fallback text)
    pub result_text: String,

    /// Stable hash of the identifying pre-normalization fields
    pub raw_fingerprint: String,
}

impl CanonicalRecord {
    /// Deterministic hash over (source, normalized regatta name, event
    /// date, sailor name), for idempotent re-runs.
    pub fn fingerprint(
        source: Source,
        regatta_name: &str,
        event_date: Option<NaiveDate>,
        sailor_name: &str,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(utils::normalize_key(regatta_name).as_bytes());
        hasher.update(b"|");
        match event_date {
            Some(date) => hasher.update(date.to_string().as_bytes()),
            None => hasher.update(b"-"),
        }
        hasher.update(b"|");
        hasher.update(utils::normalize_key(sailor_name).as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Records the matcher judged to denote one real event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchGroup {
    /// The record kept in final output
    pub survivor: CanonicalRecord,

    /// The others, retained only for the audit log
    pub absorbed: Vec<CanonicalRecord>,
}

impl MatchGroup {
    /// Total number of records in the group, survivor included.
    pub fn size(&self) -> usize {
        1 + self.absorbed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_ordering_is_declaration_order() {
        assert!(Source::SourceA < Source::SourceB);
    }

    #[test]
    fn fingerprint_is_stable() {
        let date = NaiveDate::from_ymd_opt(2024, 4, 1);
        let a = CanonicalRecord::fingerprint(Source::SourceA, "Spring Regatta", date, "Jane Doe");
        let b = CanonicalRecord::fingerprint(Source::SourceA, "Spring Regatta", date, "Jane Doe");
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_ignores_case_and_punctuation() {
        let date = NaiveDate::from_ymd_opt(2024, 4, 1);
        let a = CanonicalRecord::fingerprint(Source::SourceA, "Spring Regatta", date, "Jane Doe");
        let b = CanonicalRecord::fingerprint(Source::SourceA, "spring  regatta!", date, "JANE DOE");
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_distinguishes_sources_and_dates() {
        let date = NaiveDate::from_ymd_opt(2024, 4, 1);
        let a = CanonicalRecord::fingerprint(Source::SourceA, "Spring Regatta", date, "Jane Doe");
        let b = CanonicalRecord::fingerprint(Source::SourceB, "Spring Regatta", date, "Jane Doe");
        let c = CanonicalRecord::fingerprint(Source::SourceA, "Spring Regatta", None, "Jane Doe");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn raw_row_round_trips_fields() {
        let row = RawRow::new().with("regatta", "Spring Regatta").with("date", "04/01/2024");
        assert_eq!(row.get("regatta"), Some("Spring Regatta"));
        assert_eq!(row.get("missing"), None);
    }
}
