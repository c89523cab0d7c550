//! Google Scholar result-page adapter (HTML scraping, no structured API).

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use scraper::Html;

use super::page::{element_text, parse_selector};
use super::{SourceAdapter, finalize, parse_landing_page};
use crate::client::HttpClient;
use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{PaperRecord, RawAuthor, RawRecord, SearchQuery, SourceId};

/// Scholar never returns more than this many hits per page.
const MAX_PAGE_SIZE: usize = 20;

static CITED_BY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Cited by (\d+)").expect("static regex is valid"));

/// Parse a Scholar result page into raw records.
pub fn parse_scholar_results(html: &str) -> PipelineResult<Vec<RawRecord>> {
    let result_selector = parse_selector(".gs_r")?;
    let body_selector = parse_selector(".gs_ri")?;
    let title_selector = parse_selector(".gs_rt")?;
    let link_selector = parse_selector(".gs_rt a")?;
    let byline_selector = parse_selector(".gs_a")?;
    let snippet_selector = parse_selector(".gs_rs")?;
    let footer_selector = parse_selector(".gs_fl a")?;
    let pdf_selector = parse_selector(".gs_or_ggsm a, .gs_ggs a")?;

    let document = Html::parse_document(html);
    let mut records = Vec::new();

    for result in document.select(&result_selector) {
        let Some(body) = result.select(&body_selector).next() else {
            continue;
        };

        let title = body
            .select(&title_selector)
            .next()
            .map(element_text)
            .map(|t| strip_type_tags(&t))
            .unwrap_or_default();
        let url = body
            .select(&link_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::to_string);
        let byline = body.select(&byline_selector).next().map(element_text).unwrap_or_default();
        let (authors, venue, year) = parse_byline(&byline);
        let snippet = body.select(&snippet_selector).next().map(element_text);
        let citation_count = body
            .select(&footer_selector)
            .map(element_text)
            .find_map(|t| CITED_BY.captures(&t).and_then(|c| c[1].parse::<u64>().ok()));
        let pdf_url = result
            .select(&pdf_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::to_string);

        records.push(RawRecord {
            title: Some(title),
            r#abstract: snippet,
            authors,
            year,
            url,
            pdf_url,
            citation_count,
            venue,
            ..RawRecord::new(SourceId::Scholar)
        });
    }

    Ok(records)
}

/// Remove leading `[PDF]`, `[HTML]`, `[BOOK]`, `[CITATION]` markers.
fn strip_type_tags(title: &str) -> String {
    let mut rest = title.trim();
    while rest.starts_with('[') {
        match rest.find(']') {
            Some(end) => rest = rest[end + 1..].trim_start(),
            None => break,
        }
    }
    rest.to_string()
}

/// Split `"A Author, B Author - Venue, 2023 - publisher"`.
fn parse_byline(byline: &str) -> (Vec<RawAuthor>, Option<String>, Option<i32>) {
    let mut sections = byline.split(" - ");
    let authors = sections
        .next()
        .unwrap_or_default()
        .split(',')
        .map(|a| a.trim().trim_end_matches('…').trim())
        .filter(|a| !a.is_empty())
        .map(RawAuthor::from)
        .collect();

    let (venue, year) = sections.next().map_or((None, None), |middle| {
        let year = crate::text::extract_year(middle);
        let venue = middle
            .split(',')
            .map(str::trim)
            .find(|part| !part.is_empty() && part.parse::<i32>().is_err())
            .map(str::to_string);
        (venue, year)
    });

    (authors, venue, year)
}

/// Scholar adapter.
#[derive(Debug, Clone)]
pub struct ScholarAdapter {
    http: HttpClient,
    search_url: String,
    timeout: Duration,
}

impl ScholarAdapter {
    /// Create the adapter.
    #[must_use]
    pub fn new(http: HttpClient, config: &Config) -> Self {
        Self {
            http,
            search_url: config.scholar_search_url.clone(),
            timeout: config.scrape_timeout,
        }
    }

    async fn fetch_page(&self, url: &str, params: &[(String, String)]) -> PipelineResult<String> {
        self.http
            .get_text(url, params, &[], self.timeout)
            .await
            .map_err(|e| PipelineError::from_source(SourceId::Scholar, e))
    }
}

#[async_trait::async_trait]
impl SourceAdapter for ScholarAdapter {
    fn id(&self) -> SourceId {
        SourceId::Scholar
    }

    async fn search(&self, query: &SearchQuery) -> PipelineResult<Vec<PaperRecord>> {
        let keywords = query.keywords.trim();
        if keywords.is_empty() || query.max_results == 0 {
            return Ok(Vec::new());
        }

        let params = vec![
            ("q".to_string(), keywords.to_string()),
            ("num".to_string(), query.max_results.min(MAX_PAGE_SIZE).to_string()),
            ("hl".to_string(), "en".to_string()),
        ];
        let html = self.fetch_page(&self.search_url, &params).await?;
        let records = finalize(parse_scholar_results(&html)?, query);
        tracing::debug!(
            source = %SourceId::Scholar,
            count = records.len(),
            "Scholar search complete"
        );
        Ok(records)
    }

    fn supports(&self, id: &str) -> bool {
        url::Url::parse(id.trim()).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
    }

    async fn get_by_id(&self, id: &str) -> PipelineResult<Option<PaperRecord>> {
        if !self.supports(id) {
            return Ok(None);
        }
        let url = id.trim();
        let html = self.fetch_page(url, &[]).await?;
        let page = parse_landing_page(&html)?;
        Ok(page.into_raw(SourceId::Generic, url).into_record())
    }
}
