// src/services/normalize.rs

//! Raw row normalization.
//!
//! Maps each adapter's raw field bag to the canonical record shape. All
//! field-presence checks happen here, exactly once; downstream stages
//! only ever see fully-formed [`CanonicalRecord`]s.

use chrono::NaiveDate;
use regex::Regex;

use crate::models::{CanonicalRecord, RawRow, Source};
use crate::utils;

/// Field keys the adapters agree to use in raw rows.
pub const FIELD_REGATTA: &str = "regatta";
pub const FIELD_DATE: &str = "date";
pub const FIELD_PLACE: &str = "place";
pub const FIELD_RESULT: &str = "result";

/// Date formats observed across both sources.
const DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y",
    "%Y-%m-%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Outcome of normalizing one raw row.
///
/// `record: None` means the row is metadata noise (a header row a source
/// occasionally re-emits) and carries no warning.
#[derive(Debug, Default)]
pub struct NormalizedRow {
    pub record: Option<CanonicalRecord>,
    pub warnings: Vec<String>,
}

impl NormalizedRow {
    fn noise() -> Self {
        Self::default()
    }
}

/// Normalize a single raw row into a canonical record.
///
/// Unparsable dates and placements degrade to `None` with a warning,
/// never an error; a sailor's history should survive one bad cell.
pub fn normalize_row(source: Source, sailor_name: &str, row: &RawRow) -> NormalizedRow {
    let regatta_name = utils::normalize_whitespace(row.get(FIELD_REGATTA).unwrap_or_default());
    if regatta_name.is_empty() || is_header_text(&regatta_name) {
        return NormalizedRow::noise();
    }

    let mut warnings = Vec::new();
    let raw_date = row.get(FIELD_DATE).unwrap_or_default().trim();
    let event_date = if raw_date.is_empty() {
        warnings.push(format!("{source}: '{regatta_name}' carries no date"));
        None
    } else {
        let parsed = parse_event_date(raw_date);
        if parsed.is_none() {
            warnings.push(format!(
                "{source}: unparsable date '{raw_date}' for '{regatta_name}'"
            ));
        }
        parsed
    };

    let result_text = utils::normalize_whitespace(row.get(FIELD_RESULT).unwrap_or_default());
    let place = row
        .get(FIELD_PLACE)
        .and_then(parse_placement)
        .or_else(|| parse_placement(&result_text));

    let raw_fingerprint =
        CanonicalRecord::fingerprint(source, &regatta_name, event_date, sailor_name);

    NormalizedRow {
        record: Some(CanonicalRecord {
            source,
            sailor_name: sailor_name.to_string(),
            regatta_name,
            event_date,
            place,
            result_text,
            raw_fingerprint,
        }),
        warnings,
    }
}

/// Header rows repeat the column captions as cell text.
fn is_header_text(name: &str) -> bool {
    matches!(
        name.to_lowercase().as_str(),
        "regatta" | "event" | "name" | "results" | "result"
    )
}

/// Parse a source-native date string into a calendar date.
pub fn parse_event_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }
    // The dynamic source reports ISO-8601 timestamps.
    chrono::DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.date_naive())
}

/// Extract a numeric placement from structured or free-form result text.
///
/// Handles plain integers ("3"), place-of-fleet text ("12/45"), and
/// ordinal forms embedded in prose ("3rd in fleet").
pub fn parse_placement(text: &str) -> Option<u32> {
    let leading = Regex::new(r"^\s*(\d{1,3})\s*(?:/\s*\d+)?(?:\s|$)").ok()?;
    let ordinal = Regex::new(r"(?i)\b(\d{1,3})(?:st|nd|rd|th)\b").ok()?;

    for pattern in [&leading, &ordinal] {
        if let Some(caps) = pattern.captures(text) {
            if let Some(m) = caps.get(1) {
                if let Ok(place) = m.as_str().parse::<u32>() {
                    if place > 0 {
                        return Some(place);
                    }
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(regatta: &str, date: &str, result: &str) -> RawRow {
        RawRow::new()
            .with(FIELD_REGATTA, regatta)
            .with(FIELD_DATE, date)
            .with(FIELD_RESULT, result)
    }

    #[test]
    fn normalizes_a_complete_row() {
        let normalized = normalize_row(
            Source::SourceA,
            "Jane Doe",
            &row("  Spring   Regatta ", "04/01/2024", "3/20"),
        );
        let record = normalized.record.expect("row should normalize");
        assert_eq!(record.regatta_name, "Spring Regatta");
        assert_eq!(record.event_date, NaiveDate::from_ymd_opt(2024, 4, 1));
        assert_eq!(record.place, Some(3));
        assert!(normalized.warnings.is_empty());
    }

    #[test]
    fn header_rows_are_noise_without_warning() {
        let normalized = normalize_row(Source::SourceA, "Jane Doe", &row("Regatta", "Date", ""));
        assert!(normalized.record.is_none());
        assert!(normalized.warnings.is_empty());
    }

    #[test]
    fn unparsable_date_becomes_null_with_warning() {
        let normalized =
            normalize_row(Source::SourceB, "Jane Doe", &row("Spring Regatta", "TBD", ""));
        let record = normalized.record.expect("record survives a bad date");
        assert_eq!(record.event_date, None);
        assert_eq!(normalized.warnings.len(), 1);
        assert!(normalized.warnings[0].contains("TBD"));
    }

    #[test]
    fn structured_place_field_wins_over_result_text() {
        let raw = row("Spring Regatta", "04/01/2024", "9th overall").with(FIELD_PLACE, "4");
        let normalized = normalize_row(Source::SourceA, "Jane Doe", &raw);
        assert_eq!(normalized.record.unwrap().place, Some(4));
    }

    #[test]
    fn parses_every_known_date_format() {
        let expected = NaiveDate::from_ymd_opt(2024, 4, 1);
        for text in [
            "04/01/2024",
            "2024-04-01",
            "April 1, 2024",
            "Apr 1, 2024",
            "1 April 2024",
            "1 Apr 2024",
            "2024-04-01T00:00:00.000Z",
        ] {
            assert_eq!(parse_event_date(text), expected, "failed for {text}");
        }
        assert_eq!(parse_event_date("TBD"), None);
        assert_eq!(parse_event_date(""), None);
    }

    #[test]
    fn parses_placement_variants() {
        assert_eq!(parse_placement("3"), Some(3));
        assert_eq!(parse_placement("12/45"), Some(12));
        assert_eq!(parse_placement("3rd in fleet"), Some(3));
        assert_eq!(parse_placement("finished 21st overall"), Some(21));
        assert_eq!(parse_placement("1 | Jane Doe | 12.0"), Some(1));
        assert_eq!(parse_placement("DNF"), None);
        assert_eq!(parse_placement(""), None);
    }
}
