// src/export.rs

//! CSV interchange writers.
//!
//! The documented downstream shape is `source, regatta, date, place,
//! result`; the match log mirrors the matcher's audit trail. Quoting
//! covers separators, quotes, and embedded newlines.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::models::{CanonicalRecord, MatchGroup};

/// Quote a field if it contains a separator, quote, or line break.
fn escape(field: &str) -> String {
    if field.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn record_fields(record: &CanonicalRecord) -> String {
    let date = record
        .event_date
        .map(|d| d.to_string())
        .unwrap_or_default();
    let place = record.place.map(|p| p.to_string()).unwrap_or_default();
    [
        record.source.as_str().to_string(),
        escape(&record.regatta_name),
        date,
        place,
        escape(&record.result_text),
    ]
    .join(",")
}

/// Write surviving results in the interchange shape.
pub fn write_results_csv(path: &Path, records: &[CanonicalRecord]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "source,regatta,date,place,result")?;
    for record in records {
        writeln!(out, "{}", record_fields(record))?;
    }
    Ok(())
}

/// Write the match audit trail: each merged group's survivor followed
/// by the records it absorbed. Singleton groups are omitted.
pub fn write_match_log_csv(path: &Path, groups: &[MatchGroup]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "role,source,regatta,date,place,result")?;
    for group in groups.iter().filter(|g| !g.absorbed.is_empty()) {
        writeln!(out, "survivor,{}", record_fields(&group.survivor))?;
        for record in &group.absorbed {
            writeln!(out, "absorbed,{}", record_fields(record))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::models::Source;

    use super::*;

    fn record(regatta: &str, place: Option<u32>, result_text: &str) -> CanonicalRecord {
        let date = NaiveDate::from_ymd_opt(2024, 4, 1);
        CanonicalRecord {
            source: Source::SourceA,
            sailor_name: "Jane Doe".to_string(),
            regatta_name: regatta.to_string(),
            event_date: date,
            place,
            result_text: result_text.to_string(),
            raw_fingerprint: CanonicalRecord::fingerprint(
                Source::SourceA,
                regatta,
                date,
                "Jane Doe",
            ),
        }
    }

    #[test]
    fn escapes_only_when_needed() {
        assert_eq!(escape("Spring Regatta"), "Spring Regatta");
        assert_eq!(escape("Spring, Regatta"), "\"Spring, Regatta\"");
        assert_eq!(escape("the \"big\" one"), "\"the \"\"big\"\" one\"");
    }

    #[test]
    fn writes_results_in_interchange_shape() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("results.csv");
        let records = vec![
            record("Spring Regatta", Some(3), "3/20"),
            record("Fall, Invitational", None, ""),
        ];
        write_results_csv(&path, &records).expect("write succeeds");

        let written = std::fs::read_to_string(&path).expect("file readable");
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "source,regatta,date,place,result");
        assert_eq!(lines[1], "source-a,Spring Regatta,2024-04-01,3,3/20");
        assert_eq!(lines[2], "source-a,\"Fall, Invitational\",2024-04-01,,");
    }

    #[test]
    fn match_log_skips_singleton_groups() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("match_log.csv");
        let groups = vec![
            MatchGroup {
                survivor: record("Spring Regatta", Some(3), "3/20"),
                absorbed: vec![record("spring regatta", None, "3rd in fleet")],
            },
            MatchGroup {
                survivor: record("Harbor Cup", None, ""),
                absorbed: Vec::new(),
            },
        ];
        write_match_log_csv(&path, &groups).expect("write succeeds");

        let written = std::fs::read_to_string(&path).expect("file readable");
        assert_eq!(written.lines().count(), 3);
        assert!(written.contains("survivor,source-a,Spring Regatta"));
        assert!(written.contains("absorbed,source-a,spring regatta"));
        assert!(!written.contains("Harbor Cup"));
    }
}
