// src/pipeline/filter.rs

//! Query constraint filtering, applied before matching.

use crate::models::{CanonicalRecord, ResultQuery};

use super::progress::{Progress, Stage};

/// Apply the query constraints in fixed order: date window, name
/// substring, then the result cap in source-arrival order.
///
/// The cap bounds matcher work, not final output size; matching may
/// still shrink the visible count below the cap.
pub fn apply(
    records: Vec<CanonicalRecord>,
    query: &ResultQuery,
    progress: &Progress,
) -> Vec<CanonicalRecord> {
    let before = records.len();
    let mut kept: Vec<CanonicalRecord> = records
        .into_iter()
        .filter(|r| in_date_window(r, query))
        .filter(|r| name_matches(r, query))
        .collect();
    if kept.len() > query.max_results {
        kept.truncate(query.max_results);
    }
    progress.emit(
        Stage::Filter,
        format!("{} of {} records pass filters", kept.len(), before),
    );
    kept
}

/// Inclusive bounds. Undated records cannot be judged out of range, so
/// they pass unless the caller excluded them.
fn in_date_window(record: &CanonicalRecord, query: &ResultQuery) -> bool {
    match record.event_date {
        None => !query.exclude_undated,
        Some(date) => {
            if let Some(start) = query.start_date {
                if date < start {
                    return false;
                }
            }
            if let Some(end) = query.end_date {
                if date > end {
                    return false;
                }
            }
            true
        }
    }
}

fn name_matches(record: &CanonicalRecord, query: &ResultQuery) -> bool {
    match &query.name_contains {
        None => true,
        Some(needle) => record
            .regatta_name
            .to_lowercase()
            .contains(&needle.to_lowercase()),
    }
}
