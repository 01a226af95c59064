// src/services/mod.rs

//! Service layer for the aggregator.
//!
//! This module contains the business logic for:
//! - Static-HTML sailor pages (`StaticSiteAdapter`)
//! - Browser-automated dynamic results (`DynamicSiteAdapter`)
//! - Raw row normalization (`normalize`)
//! - Cross-source duplicate matching (`Matcher`)

use std::time::Instant;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{RawRow, ResultQuery, Source};
use crate::pipeline::Progress;

pub mod dynamic_site;
pub mod matcher;
pub mod normalize;
pub mod static_site;

pub use dynamic_site::DynamicSiteAdapter;
pub use matcher::Matcher;
pub use static_site::StaticSiteAdapter;

/// Contract shared by both result sources.
///
/// An adapter produces the raw rows for one query, respecting the
/// run-wide deadline and emitting progress events with the same cadence
/// as its sibling, so subscribers cannot distinguish source internals.
#[async_trait]
pub trait ResultSource: Send + Sync {
    /// Which canonical source this adapter feeds.
    fn source(&self) -> Source;

    /// Retrieve raw result rows for the given query.
    async fn fetch(
        &self,
        query: &ResultQuery,
        deadline: Instant,
        progress: &Progress,
    ) -> Result<Vec<RawRow>>;
}
