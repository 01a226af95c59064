// src/pipeline/run.rs

//! Run orchestration.
//!
//! Fans out to both source adapters, normalizes and filters their rows,
//! and collapses cross-source duplicates. Only query validation is
//! fatal; each source degrades to zero records plus a warning when it
//! cannot deliver.

use std::cmp::Ordering;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::models::{CanonicalRecord, Config, MatchGroup, RawRow, ResultQuery, Source};
use crate::services::{
    DynamicSiteAdapter, Matcher, ResultSource, StaticSiteAdapter, normalize,
};

use super::filter;
use super::progress::{Progress, Stage};

/// Everything a run produces: deduplicated results, the match audit
/// trail, and the warnings accumulated along the way.
#[derive(Debug)]
pub struct RunOutcome {
    /// Surviving records, newest first, undated last
    pub results: Vec<CanonicalRecord>,

    /// Full grouping, including singletons, for audit logging
    pub groups: Vec<MatchGroup>,

    /// Human-readable warnings (dead sources, dropped rows, partials)
    pub warnings: Vec<String>,
}

/// Aggregate, filter, and deduplicate one sailor's results.
pub async fn run_search(
    config: &Config,
    query: &ResultQuery,
    progress: &Progress,
) -> Result<RunOutcome> {
    match run_inner(config, query, progress).await {
        Ok(outcome) => {
            progress.emit(
                Stage::Done,
                format!("{} results after matching", outcome.results.len()),
            );
            Ok(outcome)
        }
        Err(error) => {
            progress.emit(Stage::Error, error.to_string());
            Err(error)
        }
    }
}

async fn run_inner(
    config: &Config,
    query: &ResultQuery,
    progress: &Progress,
) -> Result<RunOutcome> {
    query.validate()?;
    progress.emit(
        Stage::Start,
        format!("searching results for '{}'", query.sailor_name.trim()),
    );

    let deadline = Instant::now() + Duration::from_secs(config.run.budget_secs);
    let source_a = StaticSiteAdapter::new(config)?;
    let source_b = DynamicSiteAdapter::new(config)?;

    let (rows_a, rows_b) = futures::join!(
        fetch_source(&source_a, query, deadline, progress),
        fetch_source(&source_b, query, deadline, progress),
    );

    let mut warnings = Vec::new();
    let mut records = Vec::new();
    for (source, rows) in [(Source::SourceA, rows_a), (Source::SourceB, rows_b)] {
        match rows {
            Ok(rows) => {
                normalize_rows(source, &rows, query, &mut records, &mut warnings, progress)
            }
            Err(error) => {
                let warning = format!("{source} contributed no records: {error}");
                progress.warn(&warning);
                warnings.push(warning);
            }
        }
    }

    let filtered = filter::apply(records, query, progress);

    progress.emit(
        Stage::Match,
        format!("matching {} records across sources", filtered.len()),
    );
    let groups = Matcher::new(config.matcher.clone()).run(filtered, progress);

    let mut results: Vec<CanonicalRecord> = groups.iter().map(|g| g.survivor.clone()).collect();
    results.sort_by(presentation_order);

    Ok(RunOutcome {
        results,
        groups,
        warnings,
    })
}

/// Run one adapter, flagging results that raced the wall-clock budget.
async fn fetch_source(
    adapter: &dyn ResultSource,
    query: &ResultQuery,
    deadline: Instant,
    progress: &Progress,
) -> Result<Vec<RawRow>> {
    progress.emit(Stage::Fetch, format!("{} fetch starting", adapter.source()));
    let rows = adapter.fetch(query, deadline, progress).await?;
    if Instant::now() >= deadline {
        progress.warn(format!(
            "{}: wall-clock budget expired, results may be partial",
            adapter.source()
        ));
    }
    Ok(rows)
}

fn normalize_rows(
    source: Source,
    rows: &[RawRow],
    query: &ResultQuery,
    records: &mut Vec<CanonicalRecord>,
    warnings: &mut Vec<String>,
    progress: &Progress,
) {
    for row in rows {
        let normalized = normalize::normalize_row(source, query.sailor_name.trim(), row);
        for warning in normalized.warnings {
            progress.warn(&warning);
            warnings.push(warning);
        }
        if let Some(record) = normalized.record {
            records.push(record);
        }
    }
}

/// Presentation order: newest first, undated records last, stable for
/// equal dates.
fn presentation_order(a: &CanonicalRecord, b: &CanonicalRecord) -> Ordering {
    match (a.event_date, b.event_date) {
        (Some(da), Some(db)) => db.cmp(&da),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn record(regatta: &str, date: Option<NaiveDate>) -> CanonicalRecord {
        CanonicalRecord {
            source: Source::SourceA,
            sailor_name: "Jane Doe".to_string(),
            regatta_name: regatta.to_string(),
            event_date: date,
            place: None,
            result_text: String::new(),
            raw_fingerprint: CanonicalRecord::fingerprint(
                Source::SourceA,
                regatta,
                date,
                "Jane Doe",
            ),
        }
    }

    #[test]
    fn presentation_sorts_newest_first_with_undated_last() {
        let mut records = vec![
            record("Undated", None),
            record("Old", NaiveDate::from_ymd_opt(2023, 6, 1)),
            record("New", NaiveDate::from_ymd_opt(2024, 6, 1)),
        ];
        records.sort_by(presentation_order);
        let names: Vec<&str> = records.iter().map(|r| r.regatta_name.as_str()).collect();
        assert_eq!(names, vec!["New", "Old", "Undated"]);
    }

    #[tokio::test]
    async fn invalid_query_fails_before_any_fetch_with_error_event() {
        let (progress, mut rx) = Progress::channel();
        let query = ResultQuery::new("   ");
        let result = run_search(&Config::default(), &query, &progress).await;
        assert!(result.is_err());
        drop(progress);

        let mut stages = Vec::new();
        while let Ok(event) = rx.try_recv() {
            stages.push(event.stage);
        }
        // Fails during validation: no fetch stage, terminal error event.
        assert!(!stages.contains(&Stage::Fetch));
        assert_eq!(stages.last(), Some(&Stage::Error));
    }
}
