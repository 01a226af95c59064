// src/services/matcher.rs

//! Cross-source duplicate matching.
//!
//! Scores cross-source record pairs on name similarity and date
//! agreement, closes matching pairs transitively with union-find so the
//! relation stays an equivalence, and picks one deterministic survivor
//! per group. Pure and single-pass; no network access.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, HashSet};

use strsim::jaro_winkler;
use unicode_segmentation::UnicodeSegmentation;

use crate::models::{CanonicalRecord, MatchGroup, MatcherConfig};
use crate::pipeline::{Progress, Stage};
use crate::utils;

/// Disjoint-set over record indices.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            // Path halving keeps the trees flat.
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Smaller index wins the root, keeping grouping stable.
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}

/// Groups records that denote the same real event.
pub struct Matcher {
    config: MatcherConfig,
}

impl Matcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    /// Group the records and pick a survivor per group.
    ///
    /// The returned groups are ordered by survivor fingerprint, so the
    /// grouping is identical for any permutation of the input.
    pub fn run(&self, records: Vec<CanonicalRecord>, progress: &Progress) -> Vec<MatchGroup> {
        let mut union_find = UnionFind::new(records.len());
        for i in 0..records.len() {
            for j in (i + 1)..records.len() {
                if self.pair_matches(&records[i], &records[j]) {
                    union_find.union(i, j);
                }
            }
        }

        let mut by_root: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for index in 0..records.len() {
            let root = union_find.find(index);
            by_root.entry(root).or_default().push(index);
        }

        let mut groups = Vec::new();
        for members in by_root.into_values() {
            let mut members: Vec<CanonicalRecord> =
                members.into_iter().map(|i| records[i].clone()).collect();
            members.sort_by(survivor_order);
            let survivor = members.remove(0);
            if !members.is_empty() {
                let absorbed: Vec<&str> =
                    members.iter().map(|r| r.source.as_str()).collect();
                log::info!(
                    "merged {} records for '{}' ({}); survivor from {}",
                    members.len() + 1,
                    survivor.regatta_name,
                    absorbed.join(", "),
                    survivor.source
                );
                progress.emit(
                    Stage::Match,
                    format!(
                        "merged {} records for '{}'",
                        members.len() + 1,
                        survivor.regatta_name
                    ),
                );
            }
            groups.push(MatchGroup {
                survivor,
                absorbed: members,
            });
        }

        groups.sort_by(|a, b| a.survivor.raw_fingerprint.cmp(&b.survivor.raw_fingerprint));
        groups
    }

    /// Decide whether two records describe the same event.
    fn pair_matches(&self, a: &CanonicalRecord, b: &CanonicalRecord) -> bool {
        // Identical fingerprints are re-run duplicates and collapse
        // unconditionally, so they are never matched independently twice.
        if a.raw_fingerprint == b.raw_fingerprint {
            return true;
        }
        // Within-source duplicates are not expected otherwise.
        if a.source == b.source {
            return false;
        }

        let mut score = name_similarity(&a.regatta_name, &b.regatta_name);
        if places_agree(a, b) {
            score += self.config.place_bonus;
        }

        match (a.event_date, b.event_date) {
            (Some(da), Some(db)) => da == db && score >= self.config.name_threshold,
            // A missing date cannot block a match, but the name alone
            // must clear the stricter bar.
            _ => score >= self.config.undated_name_threshold,
        }
    }
}

/// Placement agreement strengthens a match, it is never required.
fn places_agree(a: &CanonicalRecord, b: &CanonicalRecord) -> bool {
    matches!((a.place, b.place), (Some(x), Some(y)) if x == y)
}

/// Similarity of two regatta names in `0.0..=1.0`: the better of
/// Jaro-Winkler over the normalized strings and token-set overlap.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let key_a = utils::normalize_key(a);
    let key_b = utils::normalize_key(b);
    if key_a.is_empty() || key_b.is_empty() {
        return 0.0;
    }
    if key_a == key_b {
        return 1.0;
    }
    jaro_winkler(&key_a, &key_b).max(token_overlap(&key_a, &key_b))
}

/// Jaccard overlap of the word sets.
fn token_overlap(a: &str, b: &str) -> f64 {
    let tokens_a: HashSet<&str> = a.unicode_words().collect();
    let tokens_b: HashSet<&str> = b.unicode_words().collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }
    let shared = tokens_a.intersection(&tokens_b).count() as f64;
    let total = tokens_a.union(&tokens_b).count() as f64;
    shared / total
}

/// Deterministic survivor order: dated first, then placed, then longer
/// result text, then source, then fingerprint as the final total order.
fn survivor_order(a: &CanonicalRecord, b: &CanonicalRecord) -> Ordering {
    (
        a.event_date.is_none(),
        a.place.is_none(),
        Reverse(a.result_text.len()),
        a.source,
        &a.raw_fingerprint,
    )
        .cmp(&(
            b.event_date.is_none(),
            b.place.is_none(),
            Reverse(b.result_text.len()),
            b.source,
            &b.raw_fingerprint,
        ))
}
