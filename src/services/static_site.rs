// src/services/static_site.rs

//! Static-HTML source adapter.
//!
//! Fetches a sailor's participation page and follows pagination links
//! until the source runs out of pages or the result cap is reached.
//! Only the first page is load-bearing: a later page that fails to
//! fetch means "no more pages", not a failed run.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Config, HttpConfig, RawRow, ResultQuery, Source, SourceAConfig};
use crate::pipeline::{Progress, Stage};
use crate::services::ResultSource;
use crate::services::normalize::{FIELD_DATE, FIELD_REGATTA, FIELD_RESULT};
use crate::utils;

/// One page of parsed rows plus the link to the next page, if any.
#[derive(Debug)]
pub struct ParsedPage {
    pub rows: Vec<RawRow>,
    pub next_href: Option<String>,
}

pub struct StaticSiteAdapter {
    config: SourceAConfig,
    http: HttpConfig,
    client: Client,
}

impl StaticSiteAdapter {
    /// Create a new adapter with the given configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.http.user_agent)
            .timeout(Duration::from_secs(config.http.timeout_secs))
            .build()?;
        Ok(Self {
            config: config.source_a.clone(),
            http: config.http.clone(),
            client,
        })
    }

    /// Parse one page of HTML into raw rows plus the next-page link.
    pub fn parse_page(&self, html: &str) -> Result<ParsedPage> {
        let document = Html::parse_document(html);
        let table_sel = parse_selector(&self.config.table_selector)?;
        let row_sel = parse_selector(&self.config.row_selector)?;
        let regatta_sel = parse_selector(&self.config.regatta_selector)?;
        let date_sel = parse_selector(&self.config.date_selector)?;
        let result_sel = parse_selector(&self.config.result_selector)?;
        let next_sel = parse_selector(&self.config.next_page_selector)?;

        let mut rows = Vec::new();
        for table in document.select(&table_sel) {
            for row in table.select(&row_sel) {
                if let Some(raw) = parse_result_row(&row, &regatta_sel, &date_sel, &result_sel) {
                    rows.push(raw);
                }
            }
        }

        let next_href = document
            .select(&next_sel)
            .next()
            .and_then(|el| el.value().attr("href"))
            .map(str::to_string);

        Ok(ParsedPage { rows, next_href })
    }

    async fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    /// Fetch the sailor's first page with a small bounded retry.
    async fn fetch_first_page(&self, url: &str) -> Result<String> {
        let mut last_error = String::new();
        for attempt in 0..=self.http.max_retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(self.http.request_delay_ms)).await;
            }
            match self.fetch_html(url).await {
                Ok(html) => return Ok(html),
                Err(error) => last_error = error.to_string(),
            }
        }
        Err(AppError::source_unavailable(Source::SourceA, last_error))
    }
}

/// Extract one result row; rows missing a regatta cell are skipped.
fn parse_result_row(
    row: &ElementRef,
    regatta_sel: &Selector,
    date_sel: &Selector,
    result_sel: &Selector,
) -> Option<RawRow> {
    let regatta = cell_text(row.select(regatta_sel).next()?);
    let date = row.select(date_sel).next().map(cell_text).unwrap_or_default();
    let result = row
        .select(result_sel)
        .next()
        .map(cell_text)
        .unwrap_or_default();

    Some(
        RawRow::new()
            .with(FIELD_REGATTA, regatta)
            .with(FIELD_DATE, date)
            .with(FIELD_RESULT, result),
    )
}

fn cell_text(element: ElementRef) -> String {
    utils::normalize_whitespace(&element.text().collect::<String>())
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

#[async_trait]
impl ResultSource for StaticSiteAdapter {
    fn source(&self) -> Source {
        Source::SourceA
    }

    async fn fetch(
        &self,
        query: &ResultQuery,
        deadline: Instant,
        progress: &Progress,
    ) -> Result<Vec<RawRow>> {
        let start_url = format!(
            "{}{}/",
            self.config.base_url,
            utils::sailor_slug(&query.sailor_name)
        );
        let base = Url::parse(&start_url)?;

        let mut page_html = self.fetch_first_page(&start_url).await?;
        let mut rows = Vec::new();
        let mut page_number = 1usize;

        loop {
            // A selector that cannot parse will not parse on any page;
            // that failure is configuration, not pagination.
            let page = self.parse_page(&page_html)?;
            progress.emit(
                Stage::Page,
                format!("source-a page {page_number}: {} rows", page.rows.len()),
            );
            rows.extend(page.rows);

            if rows.len() >= query.max_results {
                rows.truncate(query.max_results);
                break;
            }
            let Some(href) = page.next_href else { break };
            if Instant::now() >= deadline {
                progress.warn("source-a: run budget exhausted, returning partial results");
                break;
            }

            let next_url = utils::resolve_url(&base, &href);
            page_number += 1;
            if self.http.request_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.http.request_delay_ms)).await;
            }
            match self.fetch_html(&next_url).await {
                Ok(html) => page_html = html,
                Err(error) => {
                    // A sailor's history is inherently incremental;
                    // treat a dead page as the end of it.
                    progress.warn(format!(
                        "source-a: page {page_number} failed ({error}), keeping partial results"
                    ));
                    break;
                }
            }
        }

        progress.emit(Stage::Row, format!("source-a: {} rows fetched", rows.len()));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <table class="participation-table">
          <thead><tr><th>Regatta</th><th>Host</th><th>Date</th><th>Fleet</th><th>Place</th></tr></thead>
          <tbody>
            <tr class="row0">
              <td><a href="/regatta/spring">Spring Regatta</a></td>
              <td>Harbor YC</td>
              <td>04/01/2024</td>
              <td>A Division</td>
              <td><span class="sailor-placement-container"><a>3/20</a></span></td>
            </tr>
            <tr class="row1">
              <td>Fall Invitational</td>
              <td>City SC</td>
              <td>TBD</td>
              <td>B Division</td>
              <td>12/45</td>
            </tr>
            <tr class="row0"><td></td></tr>
          </tbody>
        </table>
        <a rel="next" href="?page=2">older results</a>
        </body></html>
    "#;

    fn adapter() -> StaticSiteAdapter {
        StaticSiteAdapter::new(&Config::default()).expect("default adapter")
    }

    #[test]
    fn parses_rows_and_next_link_from_fixture() {
        let page = adapter().parse_page(PAGE).expect("fixture parses");
        assert_eq!(page.rows.len(), 3);
        assert_eq!(page.rows[0].get(FIELD_REGATTA), Some("Spring Regatta"));
        assert_eq!(page.rows[0].get(FIELD_DATE), Some("04/01/2024"));
        assert_eq!(page.rows[0].get(FIELD_RESULT), Some("3/20"));
        assert_eq!(page.rows[1].get(FIELD_REGATTA), Some("Fall Invitational"));
        assert_eq!(page.rows[1].get(FIELD_DATE), Some("TBD"));
        assert_eq!(page.next_href.as_deref(), Some("?page=2"));
    }

    #[test]
    fn header_rows_outside_tbody_are_not_selected() {
        let page = adapter().parse_page(PAGE).expect("fixture parses");
        assert!(
            page.rows
                .iter()
                .all(|r| r.get(FIELD_REGATTA) != Some("Regatta"))
        );
    }

    #[test]
    fn last_page_has_no_next_link() {
        let html = PAGE.replace(r#"<a rel="next" href="?page=2">older results</a>"#, "");
        let page = adapter().parse_page(&html).expect("fixture parses");
        assert_eq!(page.next_href, None);
    }

    #[test]
    fn rejects_invalid_selector_configuration() {
        let mut config = Config::default();
        config.source_a.row_selector = "[[broken".to_string();
        let adapter = StaticSiteAdapter::new(&config).expect("client builds");
        assert!(adapter.parse_page(PAGE).is_err());
    }
}
