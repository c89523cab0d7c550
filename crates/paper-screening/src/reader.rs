//! Content reader: fetches richer per-source material for one record.
//!
//! Reads never fail with an error; a failed fetch is returned as an
//! [`EnrichedContent`] with `success == false` so analysis can continue on the
//! abstract alone. Successful reads are cached by `(source, url)`.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::cache::BoundedCache;
use crate::client::HttpClient;
use crate::config::{Config, fields};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Author, ContentBody, EnrichedContent, PaperRecord, S2Paper, SourceId};
use crate::sources::{
    ArxivAdapter, SemanticScholarAdapter, SourceAdapter, extract_arxiv_id,
    extract_semantic_scholar_id, parse_landing_page,
};
use crate::text;

type CacheKey = (SourceId, String);

/// Snapshot of the reader cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Entries held.
    pub size: usize,
    /// Maximum entries.
    pub capacity: usize,
    /// `source:url` keys, oldest first.
    pub keys: Vec<String>,
}

/// Per-source content fetcher with a bounded cache.
#[derive(Debug)]
pub struct ContentReader {
    http: HttpClient,
    arxiv: ArxivAdapter,
    semantic_scholar: SemanticScholarAdapter,
    cache: BoundedCache<CacheKey, EnrichedContent>,
    timeout: Duration,
}

impl ContentReader {
    /// Create a reader sharing the pipeline's HTTP client.
    #[must_use]
    pub fn new(http: HttpClient, config: &Config) -> Self {
        Self {
            arxiv: ArxivAdapter::new(http.clone(), config),
            semantic_scholar: SemanticScholarAdapter::new(http.clone(), config),
            http,
            cache: BoundedCache::new(config.content_cache_size),
            timeout: config.scrape_timeout,
        }
    }

    /// Read enriched content for `paper`.
    pub async fn read(&self, paper: &PaperRecord) -> EnrichedContent {
        let key = (paper.source, paper.url.clone());
        if let Some(cached) = self.cache.get(&key) {
            debug!(source = %paper.source, url = %paper.url, "content cache hit");
            return cached;
        }

        let outcome = match tokio::time::timeout(self.timeout, self.fetch(paper)).await {
            Ok(result) => result,
            Err(_) => Err(PipelineError::source_unavailable(
                paper.source,
                format!("content read timed out after {:?}", self.timeout),
            )),
        };

        match outcome {
            Ok(content) => {
                let enriched = EnrichedContent::found(paper.source, &paper.url, content);
                if let Some(evicted) = self.cache.insert(key, enriched.clone()) {
                    debug!(source = %evicted.0, url = %evicted.1, "content cache evicted");
                }
                enriched
            }
            Err(e) => {
                tracing::warn!(
                    source = %paper.source,
                    url = %paper.url,
                    error = %e,
                    "content read failed"
                );
                EnrichedContent::failed(paper.source, &paper.url, e.to_failure())
            }
        }
    }

    /// Cache size, capacity and keys.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            size: self.cache.len(),
            capacity: self.cache.capacity(),
            keys: self
                .cache
                .keys()
                .into_iter()
                .map(|(source, url)| format!("{source}:{url}"))
                .collect(),
        }
    }

    /// Drop every cached read.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    async fn fetch(&self, paper: &PaperRecord) -> PipelineResult<ContentBody> {
        match paper.source {
            SourceId::Arxiv => self.read_arxiv(paper).await,
            SourceId::SemanticScholar => self.read_semantic_scholar(paper).await,
            SourceId::Scholar | SourceId::Generic => self.read_page(paper).await,
        }
    }

    async fn read_arxiv(&self, paper: &PaperRecord) -> PipelineResult<ContentBody> {
        let id = extract_arxiv_id(&paper.url)
            .or_else(|| extract_arxiv_id(&paper.id))
            .ok_or_else(|| PipelineError::parse(format!("no arXiv id in {}", paper.url)))?;

        let record = self
            .arxiv
            .fetch_by_ids(std::slice::from_ref(&id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                PipelineError::source_unavailable(SourceId::Arxiv, format!("no entry for {id}"))
            })?;

        Ok(ContentBody {
            full_text: Some(record.r#abstract.clone()).filter(|t| !t.is_empty()),
            title: record.title,
            r#abstract: record.r#abstract,
            authors: record.authors,
            year: record.year,
            citation_count: record.citation_count,
            references: None,
            open_access_pdf: record.pdf_url,
        })
    }

    async fn read_semantic_scholar(&self, paper: &PaperRecord) -> PipelineResult<ContentBody> {
        let id = extract_semantic_scholar_id(&paper.url)
            .or_else(|| {
                self.semantic_scholar
                    .supports(&paper.id)
                    .then(|| paper.id.clone())
            })
            .or_else(|| paper.doi.as_ref().map(|doi| format!("DOI:{doi}")))
            .ok_or_else(|| {
                PipelineError::parse(format!("no Semantic Scholar id in {}", paper.url))
            })?;

        let wire = self
            .semantic_scholar
            .fetch_paper(&id, fields::CONTENT)
            .await?
            .ok_or_else(|| {
                PipelineError::source_unavailable(
                    SourceId::SemanticScholar,
                    format!("paper {id} not found"),
                )
            })?;

        Ok(semantic_scholar_content(wire))
    }

    async fn read_page(&self, paper: &PaperRecord) -> PipelineResult<ContentBody> {
        if paper.url.is_empty() {
            return Err(PipelineError::parse("record has no URL to read"));
        }
        let html = self
            .http
            .get_text(&paper.url, &[], &[], self.timeout)
            .await
            .map_err(|e| PipelineError::from_source(paper.source, e))?;
        let page = parse_landing_page(&html)?;

        Ok(ContentBody {
            year: page.date.as_deref().and_then(text::extract_year),
            title: page.title,
            r#abstract: page.r#abstract,
            authors: page.authors.into_iter().map(Author::named).collect(),
            citation_count: paper.citation_count,
            references: None,
            open_access_pdf: page.pdf_url,
            full_text: Some(page.full_text).filter(|t| !t.is_empty()),
        })
    }
}

fn semantic_scholar_content(wire: S2Paper) -> ContentBody {
    let citation_count = wire.citations();
    let open_access_pdf = wire.pdf_url().map(str::to_string);
    let references = wire.references.map(|refs| {
        refs.into_iter()
            .filter_map(|r| r.title)
            .filter(|t| !t.trim().is_empty())
            .collect::<Vec<_>>()
    });

    ContentBody {
        title: wire
            .title
            .as_deref()
            .map(text::clean_text)
            .unwrap_or_default(),
        r#abstract: wire
            .r#abstract
            .as_deref()
            .map(text::clean_text)
            .unwrap_or_default(),
        authors: wire
            .authors
            .into_iter()
            .filter_map(|a| a.name)
            .map(Author::named)
            .collect(),
        year: wire.year,
        citation_count,
        references,
        open_access_pdf,
        full_text: None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_semantic_scholar_content_keeps_reference_titles() {
        let wire: S2Paper = serde_json::from_value(json!({
            "paperId": "abc",
            "title": "  Spaced   Title ",
            "abstract": "An abstract.",
            "authors": [{"name": "A Person"}, {"authorId": "x"}],
            "citationCount": 12,
            "openAccessPdf": {"url": "https://example.org/p.pdf"},
            "references": [{"paperId": "r1", "title": "Ref One"}, {"paperId": "r2"}, {"title": " "}]
        }))
        .unwrap();

        let content = semantic_scholar_content(wire);
        assert_eq!(content.title, "Spaced Title");
        assert_eq!(content.authors, vec![Author::named("A Person")]);
        assert_eq!(content.citation_count, 12);
        assert_eq!(content.references, Some(vec!["Ref One".to_string()]));
        assert_eq!(content.open_access_pdf.as_deref(), Some("https://example.org/p.pdf"));
    }

    #[tokio::test]
    async fn test_record_without_url_fails_as_value() {
        let config = Config::for_testing("http://127.0.0.1:9");
        let reader = ContentReader::new(HttpClient::new(&config).unwrap(), &config);
        let paper = crate::models::RawRecord {
            title: Some("Only a title".to_string()),
            ..crate::models::RawRecord::new(SourceId::Generic)
        }
        .into_record()
        .unwrap();

        let content = reader.read(&paper).await;
        assert!(!content.success);
        assert_eq!(content.error.unwrap().kind, crate::error::ErrorKind::ParseFailure);
        assert_eq!(reader.cache_stats().size, 0);
    }
}
