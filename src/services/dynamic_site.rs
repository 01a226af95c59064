// src/services/dynamic_site.rs

//! Dynamic source adapter.
//!
//! This source renders its results tables client-side, so rows are
//! harvested through a WebDriver session: navigate, wait for data rows,
//! scroll to flush lazily rendered rows, extract text. The regatta
//! listing itself comes from the source's JSON API over plain HTTP, so
//! the browser only visits regattas worth checking.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use fantoccini::{Client as Browser, ClientBuilder, Locator};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::models::{Config, HttpConfig, RawRow, ResultQuery, Source, SourceBConfig};
use crate::pipeline::{Progress, Stage};
use crate::services::ResultSource;
use crate::services::normalize::{FIELD_DATE, FIELD_REGATTA, FIELD_RESULT};

/// Returns the text of every data row on the page, one line per row with
/// cells joined by " | ". Covers classic tables plus the virtualized
/// grid widgets this source has been seen to use; header rows carry no
/// `td`/gridcell and are skipped.
const HARVEST_ROWS_JS: &str = r#"
const out = new Set();
const push = (cells) => {
    const parts = cells.map(c => (c.innerText || c.textContent || "").trim()).filter(Boolean);
    const line = parts.join(" | ").trim();
    if (line) out.add(line);
};
document.querySelectorAll("table tbody tr").forEach(tr => {
    const tds = Array.from(tr.querySelectorAll("td"));
    if (tds.length > 0) push(tds);
});
document.querySelectorAll("[role='row']").forEach(row => {
    const cells = Array.from(row.querySelectorAll("[role='gridcell'], [role='cell']"));
    if (cells.length > 0) push(cells);
});
[[".ag-row", ".ag-cell"],
 [".ReactVirtualized__Table__row", ".ReactVirtualized__Table__rowColumn"],
 [".MuiDataGrid-row", ".MuiDataGrid-cell"],
 [".rdg-row", ".rdg-cell"]].forEach(([rowSel, cellSel]) => {
    document.querySelectorAll(rowSel).forEach(row => {
        const cells = Array.from(row.querySelectorAll(cellSel));
        if (cells.length > 0) push(cells);
    });
});
return Array.from(out);
"#;

/// Selectors whose presence means data rows have rendered.
const ROW_PROBES: &[&str] = &[
    "table tbody tr td",
    "[role='row'] [role='gridcell']",
    ".ag-row .ag-cell",
    ".ReactVirtualized__Table__row .ReactVirtualized__Table__rowColumn",
    ".MuiDataGrid-row .MuiDataGrid-cell",
    ".rdg-row .rdg-cell",
];

#[derive(Debug, Deserialize)]
struct ListingResponse {
    #[serde(default)]
    results: Vec<ListingEntry>,
}

#[derive(Debug, Deserialize)]
struct ListingEntry {
    #[serde(rename = "objectId")]
    object_id: Option<String>,
    name: Option<String>,
    #[serde(rename = "startDate")]
    start_date: Option<IsoDate>,
}

#[derive(Debug, Deserialize)]
struct IsoDate {
    iso: Option<String>,
}

/// One regatta worth driving the browser to.
#[derive(Debug, Clone)]
pub struct RegattaPage {
    pub id: String,
    pub name: String,
    pub start_date: Option<NaiveDate>,
}

pub struct DynamicSiteAdapter {
    config: SourceBConfig,
    http: HttpConfig,
    client: reqwest::Client,
}

impl DynamicSiteAdapter {
    /// Create a new adapter with the given configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.http.user_agent)
            .timeout(Duration::from_secs(config.http.timeout_secs))
            .build()?;
        Ok(Self {
            config: config.source_b.clone(),
            http: config.http.clone(),
            client,
        })
    }

    /// Fetch the public regatta listing from the JSON API.
    async fn fetch_listing(&self) -> Result<Vec<RegattaPage>> {
        let body = json!({
            "where": { "archived": { "$ne": true }, "public": true },
            "keys": "objectId,name,startDate",
            "limit": self.config.listing_limit,
            "order": "-startDate",
            "_method": "GET",
            "_ApplicationId": self.config.app_id,
        });

        // The listing API is Parse-flavored: a POST with a text/plain
        // body standing in for a GET.
        let text = self
            .client
            .post(&self.config.api_url)
            .header(CONTENT_TYPE, "text/plain")
            .body(body.to_string())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let listing: ListingResponse = serde_json::from_str(&text)?;

        let mut pages = Vec::new();
        for entry in listing.results {
            let Some(id) = entry.object_id else { continue };
            pages.push(RegattaPage {
                id,
                name: entry.name.unwrap_or_else(|| "Unnamed Regatta".to_string()),
                start_date: entry
                    .start_date
                    .and_then(|d| d.iso)
                    .and_then(|iso| parse_iso_date(&iso)),
            });
        }
        Ok(pages)
    }

    /// Restrict the listing to regattas worth a browser visit: inside
    /// the date window, matching the name filter, newest first, capped.
    /// The uniform filter stage re-applies the constraints downstream;
    /// this pass only bounds browser work.
    pub fn candidate_pages(listing: Vec<RegattaPage>, query: &ResultQuery) -> Vec<RegattaPage> {
        let needle = query.name_contains.as_deref().map(str::to_lowercase);
        let mut seen = HashSet::new();
        let mut pages: Vec<RegattaPage> = listing
            .into_iter()
            .filter(|page| seen.insert(page.id.clone()))
            .filter(|page| {
                if let Some(date) = page.start_date {
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
                }
                match &needle {
                    Some(needle) => page.name.to_lowercase().contains(needle),
                    None => true,
                }
            })
            .collect();
        pages.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        pages.truncate(query.max_results);
        pages
    }

    /// Keep only harvested lines that mention the sailor.
    pub fn rows_matching<'a>(lines: &'a [String], sailor_name: &str) -> Vec<&'a str> {
        let needle = sailor_name.trim().to_lowercase();
        lines
            .iter()
            .map(String::as_str)
            .filter(|line| line.to_lowercase().contains(&needle))
            .collect()
    }

    /// Visit each candidate results page and gather the sailor's rows.
    ///
    /// Per-page failures and timeouts are warnings, not errors: this
    /// method must get back to the caller so the browser session can be
    /// released.
    async fn scrape_pages(
        &self,
        browser: &Browser,
        pages: &[RegattaPage],
        query: &ResultQuery,
        deadline: Instant,
        progress: &Progress,
    ) -> Vec<RawRow> {
        let mut rows = Vec::new();
        for (index, page) in pages.iter().enumerate() {
            if Instant::now() >= deadline {
                progress.warn("source-b: run budget exhausted, returning partial results");
                break;
            }
            if rows.len() >= query.max_results {
                break;
            }

            let url = self.config.results_url_template.replace("{id}", &page.id);
            progress.emit(
                Stage::Page,
                format!("source-b page {}/{}: {}", index + 1, pages.len(), page.name),
            );

            if let Err(error) = browser.goto(&url).await {
                progress.warn(format!("source-b: failed to open '{}': {error}", page.name));
                continue;
            }

            let lines = match self.harvest_rows(browser, query.timeout_secs, deadline).await {
                Ok(lines) => lines,
                Err(AppError::ScrapeTimeout { secs, .. }) => {
                    progress.warn(format!(
                        "source-b: '{}' did not render within {secs}s",
                        page.name
                    ));
                    continue;
                }
                Err(error) => {
                    progress.warn(format!(
                        "source-b: harvest failed for '{}': {error}",
                        page.name
                    ));
                    continue;
                }
            };

            let date_field = page.start_date.map(|d| d.to_string()).unwrap_or_default();
            for line in Self::rows_matching(&lines, &query.sailor_name) {
                rows.push(
                    RawRow::new()
                        .with(FIELD_REGATTA, page.name.clone())
                        .with(FIELD_DATE, date_field.clone())
                        .with(FIELD_RESULT, line),
                );
            }
        }
        rows
    }

    /// Wait for data rows to render, then harvest them, scrolling
    /// between passes so virtualized tables release their lazy rows.
    async fn harvest_rows(
        &self,
        browser: &Browser,
        timeout_secs: u64,
        deadline: Instant,
    ) -> Result<Vec<String>> {
        let wait_deadline = deadline.min(Instant::now() + Duration::from_secs(timeout_secs));
        let poll = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            if self.any_rows_present(browser).await? {
                break;
            }
            if Instant::now() >= wait_deadline {
                return Err(AppError::scrape_timeout(Source::SourceB, timeout_secs));
            }
            tokio::time::sleep(poll).await;
        }

        let mut lines: Vec<String> = Vec::new();
        for _ in 0..self.config.max_scroll_passes {
            let before = lines.len();
            for line in self.run_harvest(browser).await? {
                if !lines.contains(&line) {
                    lines.push(line);
                }
            }
            // No new rows after a pass means the table is fully rendered.
            if lines.len() == before && !lines.is_empty() {
                break;
            }
            if Instant::now() >= wait_deadline {
                break;
            }
            browser
                .execute(
                    "window.scrollBy(0, Math.max(600, window.innerHeight));",
                    vec![],
                )
                .await?;
            tokio::time::sleep(poll).await;
        }
        Ok(lines)
    }

    async fn any_rows_present(&self, browser: &Browser) -> Result<bool> {
        for probe in ROW_PROBES {
            if !browser.find_all(Locator::Css(probe)).await?.is_empty() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn run_harvest(&self, browser: &Browser) -> Result<Vec<String>> {
        let value = browser.execute(HARVEST_ROWS_JS, vec![]).await?;
        Ok(value
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default())
    }
}

fn parse_iso_date(iso: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(iso).ok().map(|dt| dt.date_naive())
}

#[async_trait]
impl ResultSource for DynamicSiteAdapter {
    fn source(&self) -> Source {
        Source::SourceB
    }

    async fn fetch(
        &self,
        query: &ResultQuery,
        deadline: Instant,
        progress: &Progress,
    ) -> Result<Vec<RawRow>> {
        let listing = self
            .fetch_listing()
            .await
            .map_err(|e| AppError::source_unavailable(Source::SourceB, e.to_string()))?;
        progress.emit(
            Stage::Fetch,
            format!("source-b: {} regattas listed", listing.len()),
        );

        let pages = Self::candidate_pages(listing, query);
        if pages.is_empty() {
            progress.emit(Stage::Row, "source-b: 0 rows fetched");
            return Ok(Vec::new());
        }
        progress.emit(
            Stage::Fetch,
            format!("source-b: checking {} regattas", pages.len()),
        );

        // Exactly one browser session per invocation, released on every
        // exit path below.
        let browser = ClientBuilder::native()
            .connect(&self.config.webdriver_url)
            .await
            .map_err(|e| {
                AppError::source_unavailable(Source::SourceB, format!("webdriver: {e}"))
            })?;

        let rows = self
            .scrape_pages(&browser, &pages, query, deadline, progress)
            .await;

        if let Err(error) = browser.close().await {
            log::warn!("source-b: failed to close browser session: {error}");
        }

        progress.emit(Stage::Row, format!("source-b: {} rows fetched", rows.len()));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(id: &str, name: &str, date: Option<NaiveDate>) -> RegattaPage {
        RegattaPage {
            id: id.to_string(),
            name: name.to_string(),
            start_date: date,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn candidate_pages_filter_sort_and_cap() {
        let mut query = ResultQuery::new("Jane Doe");
        query.start_date = date(2024, 1, 1);
        query.max_results = 2;

        let listing = vec![
            page("a", "Winter Frostbite", date(2023, 12, 2)),
            page("b", "Spring Regatta", date(2024, 4, 1)),
            page("c", "Harbor Cup", date(2024, 5, 4)),
            page("c", "Harbor Cup", date(2024, 5, 4)),
            page("d", "Summer Series", date(2024, 6, 15)),
        ];
        let pages = DynamicSiteAdapter::candidate_pages(listing, &query);
        let ids: Vec<&str> = pages.iter().map(|p| p.id.as_str()).collect();
        // Newest first, duplicate ids dropped, capped at two.
        assert_eq!(ids, vec!["d", "c"]);
    }

    #[test]
    fn candidate_pages_keep_undated_regattas() {
        let mut query = ResultQuery::new("Jane Doe");
        query.start_date = date(2024, 1, 1);

        let pages =
            DynamicSiteAdapter::candidate_pages(vec![page("a", "Mystery Cup", None)], &query);
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn candidate_pages_apply_name_filter() {
        let mut query = ResultQuery::new("Jane Doe");
        query.name_contains = Some("regatta".to_string());

        let listing = vec![
            page("a", "Spring Regatta", date(2024, 4, 1)),
            page("b", "Harbor Cup", date(2024, 5, 4)),
        ];
        let pages = DynamicSiteAdapter::candidate_pages(listing, &query);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].name, "Spring Regatta");
    }

    #[test]
    fn rows_matching_is_a_case_insensitive_substring_check() {
        let lines = vec![
            "1 | JANE DOE | Harbor YC | 12.0".to_string(),
            "2 | John Smith | City SC | 14.0".to_string(),
        ];
        let matched = DynamicSiteAdapter::rows_matching(&lines, " jane doe ");
        assert_eq!(matched, vec!["1 | JANE DOE | Harbor YC | 12.0"]);
    }

    #[test]
    fn listing_parses_and_tolerates_gaps() {
        let payload = r#"{
            "results": [
                {"objectId": "r1", "name": "Spring Regatta",
                 "startDate": {"iso": "2024-04-01T00:00:00.000Z"}},
                {"objectId": "r2", "startDate": {"iso": "not a date"}},
                {"name": "No Id Regatta"}
            ]
        }"#;
        let listing: ListingResponse = serde_json::from_str(payload).expect("payload parses");
        assert_eq!(listing.results.len(), 3);

        let iso = listing.results[0]
            .start_date
            .as_ref()
            .and_then(|d| d.iso.as_deref())
            .expect("first entry has a date");
        assert_eq!(parse_iso_date(iso), NaiveDate::from_ymd_opt(2024, 4, 1));
        assert_eq!(parse_iso_date("not a date"), None);
    }
}
