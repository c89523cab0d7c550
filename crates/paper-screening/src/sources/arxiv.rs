//! arXiv Atom API adapter.

use std::sync::LazyLock;
use std::time::Duration;

use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;

use super::{SourceAdapter, finalize};
use crate::client::HttpClient;
use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{
    ArxivFilters, PaperRecord, RawAuthor, RawRecord, SearchQuery, SortBy, SortOrder, SourceId,
};

static NEW_STYLE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}\.\d{4,5}(v\d+)?$").expect("static regex is valid"));

static OLD_STYLE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z\-]*(\.[A-Z]{2})?/\d{7}(v\d+)?$").expect("static regex is valid")
});

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    published: Option<String>,
    #[serde(default)]
    updated: Option<String>,
    #[serde(rename = "author", default)]
    authors: Vec<AtomAuthor>,
    #[serde(rename = "category", default)]
    categories: Vec<AtomCategory>,
    #[serde(rename = "arxiv:doi", alias = "doi", default)]
    doi: Option<String>,
    #[serde(rename = "arxiv:journal_ref", alias = "journal_ref", default)]
    journal_ref: Option<String>,
    // arXiv interleaves links with other elements, which needs the
    // `overlapped-lists` feature of quick-xml.
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "arxiv:affiliation", alias = "affiliation", default)]
    affiliation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomCategory {
    #[serde(rename = "@term")]
    term: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@type")]
    link_type: Option<String>,
    #[serde(rename = "@title")]
    title: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

/// Parse an arXiv Atom feed into raw records.
///
/// Entries are kept even when fields are missing; empty records are
/// dropped later by normalization. API error entries are skipped.
pub fn parse_atom_feed(xml: &str) -> PipelineResult<Vec<RawRecord>> {
    let feed: AtomFeed =
        from_str(xml).map_err(|e| PipelineError::parse(format!("invalid atom xml: {e}")))?;

    Ok(feed
        .entries
        .into_iter()
        .filter(|entry| !entry.id.as_deref().is_some_and(|id| id.contains("/api/errors")))
        .map(entry_to_raw)
        .collect())
}

fn entry_to_raw(entry: AtomEntry) -> RawRecord {
    let id_url = entry.id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty());
    let native_id = id_url.as_deref().and_then(extract_arxiv_id);

    let pdf_url = entry
        .links
        .iter()
        .find(|l| {
            l.title.as_deref() == Some("pdf") || l.link_type.as_deref() == Some("application/pdf")
        })
        .and_then(|l| l.href.as_deref())
        .map(normalize_arxiv_url);
    let abs_url = entry
        .links
        .iter()
        .find(|l| l.rel.as_deref() == Some("alternate"))
        .and_then(|l| l.href.as_deref())
        .or(id_url.as_deref())
        .map(normalize_arxiv_url);

    RawRecord {
        native_id,
        title: entry.title,
        r#abstract: entry.summary,
        authors: entry
            .authors
            .into_iter()
            .map(|a| RawAuthor {
                name: a.name.unwrap_or_default(),
                affiliation: a.affiliation,
                email: None,
            })
            .collect(),
        published: entry.published,
        updated: entry.updated,
        url: abs_url,
        pdf_url,
        doi: entry.doi,
        venue: entry.journal_ref,
        categories: entry.categories.into_iter().filter_map(|c| c.term).collect(),
        ..RawRecord::new(SourceId::Arxiv)
    }
}

/// Extract an arXiv identifier (version kept) from an abs/pdf URL or bare id.
#[must_use]
pub fn extract_arxiv_id(input: &str) -> Option<String> {
    let input = input.trim();
    let tail = ["/abs/", "/pdf/"]
        .iter()
        .find_map(|marker| input.find(marker).map(|pos| &input[pos + marker.len()..]))
        .unwrap_or(input);
    let tail = tail.trim_end_matches('/').trim_end_matches(".pdf");
    let tail = tail.split(['?', '#']).next().unwrap_or(tail);
    (!tail.is_empty() && is_arxiv_id(tail)).then(|| tail.to_string())
}

fn is_arxiv_id(id: &str) -> bool {
    NEW_STYLE_ID.is_match(id) || OLD_STYLE_ID.is_match(id)
}

fn normalize_arxiv_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("http://arxiv.org/") {
        return format!("https://arxiv.org/{rest}");
    }
    url.to_string()
}

/// arXiv adapter.
#[derive(Debug, Clone)]
pub struct ArxivAdapter {
    http: HttpClient,
    api_url: String,
    timeout: Duration,
}

impl ArxivAdapter {
    /// Create the adapter.
    #[must_use]
    pub fn new(http: HttpClient, config: &Config) -> Self {
        Self {
            http,
            api_url: config.arxiv_api_url.clone(),
            timeout: config.source_timeout,
        }
    }

    /// Build an arXiv `search_query` string from structured filters.
    #[must_use]
    pub fn build_search_query(filters: &ArxivFilters) -> String {
        let mut parts = Vec::new();

        if !filters.keywords.is_empty() {
            let keywords = filters
                .keywords
                .iter()
                .map(|k| format!("all:{k}"))
                .collect::<Vec<_>>();
            parts.push(keywords.join(" AND "));
        }
        if !filters.authors.is_empty() {
            let authors = filters
                .authors
                .iter()
                .map(|a| format!("au:{a}"))
                .collect::<Vec<_>>();
            parts.push(format!("({})", authors.join(" OR ")));
        }
        if !filters.categories.is_empty() {
            let cats = filters
                .categories
                .iter()
                .map(|c| format!("cat:{c}"))
                .collect::<Vec<_>>();
            parts.push(format!("({})", cats.join(" OR ")));
        }
        if let Some(title) = filters.title.as_deref().filter(|t| !t.is_empty()) {
            parts.push(format!("ti:{title}"));
        }
        if let Some(from) = filters.date_from.as_deref().filter(|d| !d.is_empty()) {
            parts.push(format!("submittedDate:[{from} TO *]"));
        }
        if let Some(to) = filters.date_to.as_deref().filter(|d| !d.is_empty()) {
            parts.push(format!("submittedDate:[* TO {to}]"));
        }

        parts.join(" AND ")
    }

    /// Most recent submissions in a category.
    pub async fn latest(
        &self,
        category: &str,
        max_results: usize,
    ) -> PipelineResult<Vec<PaperRecord>> {
        let filters = ArxivFilters {
            categories: vec![category.to_string()],
            ..ArxivFilters::default()
        };
        let query = SearchQuery::new("", max_results);
        self.run(&Self::build_search_query(&filters), &query).await
    }

    /// Submissions by one author.
    pub async fn by_author(
        &self,
        author: &str,
        max_results: usize,
    ) -> PipelineResult<Vec<PaperRecord>> {
        let filters = ArxivFilters {
            authors: vec![author.to_string()],
            ..ArxivFilters::default()
        };
        let query = SearchQuery::new("", max_results);
        self.run(&Self::build_search_query(&filters), &query).await
    }

    /// Title search, best matches first.
    pub async fn search_by_title(
        &self,
        title: &str,
        max_results: usize,
    ) -> PipelineResult<Vec<PaperRecord>> {
        let title = title.trim();
        if title.is_empty() || max_results == 0 {
            return Ok(Vec::new());
        }
        let query = SearchQuery::new(title, max_results)
            .sorted(SortBy::Relevance, SortOrder::Descending);
        self.run(&format!("ti:{title}"), &query).await
    }

    /// Fetch records by arXiv id through `id_list`.
    pub async fn fetch_by_ids(&self, ids: &[String]) -> PipelineResult<Vec<PaperRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let params = vec![
            ("id_list".to_string(), ids.join(",")),
            ("max_results".to_string(), ids.len().to_string()),
        ];
        let raw = self.fetch(&params).await?;
        Ok(raw.into_iter().filter_map(RawRecord::into_record).collect())
    }

    async fn run(
        &self,
        search_query: &str,
        query: &SearchQuery,
    ) -> PipelineResult<Vec<PaperRecord>> {
        let sort_by = query.sort_by.unwrap_or_default().as_arxiv();
        let sort_order = query.sort_order.unwrap_or_default().as_arxiv();
        let params = vec![
            ("search_query".to_string(), search_query.to_string()),
            ("start".to_string(), "0".to_string()),
            ("max_results".to_string(), query.capped_results().to_string()),
            ("sortBy".to_string(), sort_by.to_string()),
            ("sortOrder".to_string(), sort_order.to_string()),
        ];

        let raw = self.fetch(&params).await?;
        let records = finalize(raw, query);
        tracing::debug!(source = %SourceId::Arxiv, count = records.len(), "arXiv search complete");
        Ok(records)
    }

    async fn fetch(&self, params: &[(String, String)]) -> PipelineResult<Vec<RawRecord>> {
        let xml = self
            .http
            .get_text(&self.api_url, params, &[], self.timeout)
            .await
            .map_err(|e| PipelineError::from_source(SourceId::Arxiv, e))?;
        parse_atom_feed(&xml)
    }
}

#[async_trait::async_trait]
impl SourceAdapter for ArxivAdapter {
    fn id(&self) -> SourceId {
        SourceId::Arxiv
    }

    async fn search(&self, query: &SearchQuery) -> PipelineResult<Vec<PaperRecord>> {
        let keywords = query.keywords.trim();
        if keywords.is_empty() || query.max_results == 0 {
            return Ok(Vec::new());
        }
        // Field-qualified queries (`ti:...`, `cat:...`) pass through untouched.
        let search_query = if keywords.contains(':') {
            keywords.to_string()
        } else {
            format!("all:{keywords}")
        };
        self.run(&search_query, query).await
    }

    fn supports(&self, id: &str) -> bool {
        is_arxiv_id(id.trim())
    }

    async fn get_by_id(&self, id: &str) -> PipelineResult<Option<PaperRecord>> {
        let Some(id) = extract_arxiv_id(id) else {
            return Ok(None);
        };
        Ok(self.fetch_by_ids(&[id]).await?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <updated>2023-08-02T17:54:37Z</updated>
    <published>2017-06-12T17:57:40Z</published>
    <title>
      Attention Is All
      You Need
    </title>
    <summary>The dominant sequence transduction models are based on recurrent networks.</summary>
    <author>
      <name>Ashish Vaswani</name>
      <arxiv:affiliation>Google Brain</arxiv:affiliation>
    </author>
    <author><name>Noam Shazeer</name></author>
    <arxiv:doi>10.48550/arXiv.1706.03762</arxiv:doi>
    <link rel="alternate" type="text/html" href="http://arxiv.org/abs/1706.03762v7" />
    <link title="pdf" rel="related" type="application/pdf"
          href="http://arxiv.org/pdf/1706.03762v7" />
    <category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2401.00002v1</id>
    <title>   </title>
    <summary></summary>
  </entry>
</feed>
"#;

    #[test]
    fn test_parse_feed_extracts_fields() {
        let raw = parse_atom_feed(FEED).unwrap();
        assert_eq!(raw.len(), 2);

        let record = raw.into_iter().next().unwrap().into_record().unwrap();
        assert_eq!(record.id, "1706.03762v7");
        assert_eq!(record.title, "Attention Is All You Need");
        assert_eq!(record.authors.len(), 2);
        assert_eq!(record.authors[0].affiliation.as_deref(), Some("Google Brain"));
        assert_eq!(record.year, Some(2017));
        assert_eq!(record.url, "https://arxiv.org/abs/1706.03762v7");
        assert_eq!(record.pdf_url.as_deref(), Some("https://arxiv.org/pdf/1706.03762v7"));
        assert_eq!(record.doi.as_deref(), Some("10.48550/arXiv.1706.03762"));
        assert!(record.categories.contains("cs.CL"));
    }

    // Live feeds put the DOI link before the comment and journal reference,
    // then the abstract and PDF links.
    const INTERLEAVED_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <entry>
    <id>http://arxiv.org/abs/2106.15928v2</id>
    <updated>2021-09-01T10:00:00Z</updated>
    <published>2021-06-30T09:00:00Z</published>
    <title>Planning With Learned Models</title>
    <summary>We study planning with models learned from interaction data.</summary>
    <author><name>Ada Lovelace</name></author>
    <arxiv:doi>10.1000/plan.2021.7</arxiv:doi>
    <link title="doi" href="http://dx.doi.org/10.1000/plan.2021.7" rel="related"/>
    <arxiv:comment>12 pages, 4 figures</arxiv:comment>
    <arxiv:journal_ref>Journal of Planning 7 (2021)</arxiv:journal_ref>
    <link href="http://arxiv.org/abs/2106.15928v2" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2106.15928v2" rel="related"
          type="application/pdf"/>
    <arxiv:primary_category term="cs.AI" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.AI" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
</feed>
"#;

    #[test]
    fn test_parse_interleaved_links() {
        let raw = parse_atom_feed(INTERLEAVED_FEED).unwrap();
        assert_eq!(raw.len(), 1);

        let record = raw.into_iter().next().unwrap().into_record().unwrap();
        assert_eq!(record.id, "2106.15928v2");
        assert_eq!(record.url, "https://arxiv.org/abs/2106.15928v2");
        assert_eq!(record.pdf_url.as_deref(), Some("https://arxiv.org/pdf/2106.15928v2"));
        assert_eq!(record.doi.as_deref(), Some("10.1000/plan.2021.7"));
        assert_eq!(record.venue.as_deref(), Some("Journal of Planning 7 (2021)"));
        assert_eq!(record.categories.len(), 2);
    }

    #[test]
    fn test_empty_entries_are_dropped_by_normalization() {
        let raw = parse_atom_feed(FEED).unwrap();
        let kept: Vec<_> = raw.into_iter().filter_map(RawRecord::into_record).collect();
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_malformed_xml_is_parse_failure() {
        let err = parse_atom_feed("<feed><entry><title>oops</feed>").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ParseFailure);
    }

    #[test]
    fn test_error_entries_are_skipped() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
          <entry><id>http://arxiv.org/api/errors#incorrect_id_format</id><title>Error</title>
          <summary>incorrect id format</summary></entry></feed>"#;
        assert!(parse_atom_feed(xml).unwrap().is_empty());
    }

    #[test]
    fn test_supports_id_formats() {
        let adapter = ArxivAdapter::new(
            HttpClient::new(&Config::default()).unwrap(),
            &Config::default(),
        );
        assert!(adapter.supports("2401.12345"));
        assert!(adapter.supports("2401.12345v3"));
        assert!(adapter.supports("1706.0376"));
        assert!(adapter.supports("hep-th/9901001"));
        assert!(adapter.supports("math.GT/0309136v1"));
        assert!(!adapter.supports("10.1234/abc"));
        assert!(!adapter.supports("24011.2345"));
    }

    #[test]
    fn test_extract_arxiv_id_from_urls() {
        assert_eq!(
            extract_arxiv_id("https://arxiv.org/abs/2401.12345v2").as_deref(),
            Some("2401.12345v2")
        );
        assert_eq!(
            extract_arxiv_id("https://arxiv.org/pdf/2401.12345.pdf").as_deref(),
            Some("2401.12345")
        );
        assert_eq!(extract_arxiv_id("hep-th/9901001").as_deref(), Some("hep-th/9901001"));
        assert_eq!(extract_arxiv_id("https://example.org/paper"), None);
    }

    #[test]
    fn test_build_search_query() {
        let filters = ArxivFilters {
            keywords: vec!["agent".to_string(), "benchmark".to_string()],
            authors: vec!["Smith".to_string(), "Lee".to_string()],
            categories: vec!["cs.AI".to_string()],
            title: Some("planning".to_string()),
            date_from: Some("20240101".to_string()),
            date_to: None,
        };
        assert_eq!(
            ArxivAdapter::build_search_query(&filters),
            "all:agent AND all:benchmark AND (au:Smith OR au:Lee) AND (cat:cs.AI) AND ti:planning \
             AND submittedDate:[20240101 TO *]"
        );
        assert_eq!(ArxivAdapter::build_search_query(&ArxivFilters::default()), "");
    }
}
