//! Semantic Scholar Graph API adapter.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use super::{SourceAdapter, finalize};
use crate::client::HttpClient;
use crate::config::{Config, api, fields};
use crate::error::{ClientError, PipelineError, PipelineResult};
use crate::models::{
    AuthorProfile, PaperPage, PaperRecord, S2AuthorProfile, S2CitationPage, S2Paper,
    S2SearchResult, ScholarlyFilters, SearchQuery, SortBy, SortOrder, SourceId,
};

static PAPER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{40}$").expect("static regex is valid"));

static PREFIXED_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(DOI:10\.\d{4,9}/\S+|ARXIV:\S+|CorpusId:\d+)$").expect("static regex is valid")
});

/// Semantic Scholar adapter.
#[derive(Clone)]
pub struct SemanticScholarAdapter {
    http: HttpClient,
    api_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl SemanticScholarAdapter {
    /// Create the adapter.
    #[must_use]
    pub fn new(http: HttpClient, config: &Config) -> Self {
        Self {
            http,
            api_url: config.semantic_scholar_api_url.clone(),
            api_key: config.semantic_scholar_api_key.clone(),
            timeout: config.source_timeout,
        }
    }

    /// Check if an API key is configured.
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Build a fielded query string from structured filters.
    #[must_use]
    pub fn build_advanced_query(filters: &ScholarlyFilters) -> String {
        let mut parts = Vec::new();

        if let Some(title) = filters.title.as_deref().filter(|t| !t.is_empty()) {
            parts.push(format!("title:\"{title}\""));
        }
        if !filters.authors.is_empty() {
            let authors = filters
                .authors
                .iter()
                .map(|a| format!("authors:\"{a}\""))
                .collect::<Vec<_>>();
            parts.push(format!("({})", authors.join(" OR ")));
        }
        if let Some(abs) = filters.r#abstract.as_deref().filter(|a| !a.is_empty()) {
            parts.push(format!("abstract:\"{abs}\""));
        }
        if let Some(venue) = filters.venue.as_deref().filter(|v| !v.is_empty()) {
            parts.push(format!("venue:\"{venue}\""));
        }
        match (filters.year_from, filters.year_to) {
            (Some(from), Some(to)) => parts.push(format!("year:{from}-{to}")),
            (Some(from), None) => parts.push(format!("year:{from}-")),
            (None, Some(to)) => parts.push(format!("year:-{to}")),
            (None, None) => {}
        }
        if !filters.fields_of_study.is_empty() {
            let fields = filters
                .fields_of_study
                .iter()
                .map(|f| format!("fieldsOfStudy:\"{f}\""))
                .collect::<Vec<_>>();
            parts.push(format!("({})", fields.join(" OR ")));
        }
        if filters.min_citation_count > 0 {
            parts.push(format!("citationCount:{}-", filters.min_citation_count));
        }

        parts.join(" AND ")
    }

    /// Fetch the wire record with reference and PDF fields.
    ///
    /// Returns `Ok(None)` when the paper does not exist.
    pub async fn fetch_paper(
        &self,
        paper_id: &str,
        field_set: &[&str],
    ) -> PipelineResult<Option<S2Paper>> {
        let url = format!("{}/paper/{}", self.api_url, paper_id);
        let params = vec![("fields".to_string(), field_set.join(","))];
        self.get_optional(&url, &params).await
    }

    /// Papers citing `paper_id`, one page at a time.
    pub async fn citations(
        &self,
        paper_id: &str,
        limit: usize,
        offset: usize,
    ) -> PipelineResult<PaperPage> {
        self.linked_papers(paper_id, "citations", "citingPaper", limit, offset)
            .await
    }

    /// Papers referenced by `paper_id`, one page at a time.
    pub async fn references(
        &self,
        paper_id: &str,
        limit: usize,
        offset: usize,
    ) -> PipelineResult<PaperPage> {
        self.linked_papers(paper_id, "references", "citedPaper", limit, offset)
            .await
    }

    /// Papers matching an author name, in backend relevance order.
    pub async fn search_by_author(
        &self,
        author: &str,
        limit: usize,
        offset: usize,
    ) -> PipelineResult<Vec<PaperRecord>> {
        let author = author.trim();
        if author.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let query =
            SearchQuery::new(author, limit).sorted(SortBy::Relevance, SortOrder::Descending);
        let result = self.search_page(&query, offset).await?;
        Ok(finalize(
            result.data.into_iter().map(S2Paper::into_raw).collect(),
            &query,
        ))
    }

    /// Author profile with recent papers.
    ///
    /// Returns `Ok(None)` when the author does not exist.
    pub async fn get_author(&self, author_id: &str) -> PipelineResult<Option<AuthorProfile>> {
        let url = format!("{}/author/{}", self.api_url, author_id.trim());
        let params = vec![("fields".to_string(), fields::AUTHOR.join(","))];
        let profile: Option<S2AuthorProfile> = self.get_optional(&url, &params).await?;
        Ok(profile.and_then(S2AuthorProfile::into_profile))
    }

    async fn linked_papers(
        &self,
        paper_id: &str,
        edge: &str,
        prefix: &str,
        limit: usize,
        offset: usize,
    ) -> PipelineResult<PaperPage> {
        let url = format!("{}/paper/{}/{edge}", self.api_url, paper_id.trim());
        let separator = format!(",{prefix}.");
        let params = vec![
            ("offset".to_string(), offset.to_string()),
            (
                "limit".to_string(),
                limit.min(api::MAX_RESULTS_PER_SOURCE).to_string(),
            ),
            (
                "fields".to_string(),
                format!("{prefix}.{}", fields::CITATION.join(&separator)),
            ),
        ];

        let page: S2CitationPage = self
            .http
            .get_json(&url, &params, &self.headers(), self.timeout)
            .await
            .map_err(|e| PipelineError::from_source(SourceId::SemanticScholar, e))?;

        let page = page.into_page();
        tracing::debug!(
            source = %SourceId::SemanticScholar,
            paper = paper_id,
            edge,
            count = page.papers.len(),
            next = ?page.next,
            "linked papers fetched"
        );
        Ok(page)
    }

    async fn search_page(
        &self,
        query: &SearchQuery,
        offset: usize,
    ) -> PipelineResult<S2SearchResult> {
        let url = format!("{}/paper/search", self.api_url);
        let params = vec![
            ("query".to_string(), query.keywords.trim().to_string()),
            ("limit".to_string(), query.capped_results().to_string()),
            ("offset".to_string(), offset.to_string()),
            ("fields".to_string(), fields::SEARCH.join(",")),
        ];

        self.http
            .get_json(&url, &params, &self.headers(), self.timeout)
            .await
            .map_err(|e| PipelineError::from_source(SourceId::SemanticScholar, e))
    }

    async fn get_optional<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> PipelineResult<Option<T>> {
        match self
            .http
            .get_json::<T>(url, params, &self.headers(), self.timeout)
            .await
        {
            Ok(value) => Ok(Some(value)),
            Err(ClientError::NotFound { .. }) => Ok(None),
            Err(e) => Err(PipelineError::from_source(SourceId::SemanticScholar, e)),
        }
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        self.api_key
            .as_deref()
            .map(|key| vec![("x-api-key", key)])
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl SourceAdapter for SemanticScholarAdapter {
    fn id(&self) -> SourceId {
        SourceId::SemanticScholar
    }

    async fn search(&self, query: &SearchQuery) -> PipelineResult<Vec<PaperRecord>> {
        let keywords = query.keywords.trim();
        if keywords.is_empty() || query.max_results == 0 {
            return Ok(Vec::new());
        }

        let result = self.search_page(query, 0).await?;
        let total = result.total;
        let records = finalize(
            result.data.into_iter().map(S2Paper::into_raw).collect(),
            query,
        );
        tracing::debug!(
            source = %SourceId::SemanticScholar,
            total,
            count = records.len(),
            "Semantic Scholar search complete"
        );
        Ok(records)
    }

    fn supports(&self, id: &str) -> bool {
        let id = id.trim();
        PAPER_ID.is_match(id) || PREFIXED_ID.is_match(id)
    }

    async fn get_by_id(&self, id: &str) -> PipelineResult<Option<PaperRecord>> {
        let paper = self.fetch_paper(id.trim(), fields::SEARCH).await?;
        Ok(paper.and_then(|p| p.into_raw().into_record()))
    }
}

impl std::fmt::Debug for SemanticScholarAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticScholarAdapter")
            .field("api_url", &self.api_url)
            .field("has_api_key", &self.has_api_key())
            .finish()
    }
}

/// Extract the 40-hex paper id from a semanticscholar.org URL.
#[must_use]
pub fn extract_semantic_scholar_id(url: &str) -> Option<String> {
    url.split(['/', '?', '#'])
        .filter(|segment| PAPER_ID.is_match(segment))
        .last()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> SemanticScholarAdapter {
        let config = Config::default();
        SemanticScholarAdapter::new(HttpClient::new(&config).unwrap(), &config)
    }

    #[test]
    fn test_supports_id_formats() {
        let adapter = adapter();
        assert!(adapter.supports("649def34f8be52c8b66281af98ae884c09aef38b"));
        assert!(adapter.supports("DOI:10.18653/v1/N18-3011"));
        assert!(adapter.supports("ARXIV:2106.15928"));
        assert!(adapter.supports("CorpusId:215416146"));
        assert!(!adapter.supports("649def34"));
        assert!(!adapter.supports("CorpusId:abc"));
        assert!(!adapter.supports("10.18653/v1/N18-3011"));
    }

    #[test]
    fn test_build_advanced_query() {
        let filters = ScholarlyFilters {
            title: Some("attention".to_string()),
            authors: vec!["Vaswani".to_string()],
            year_from: Some(2017),
            min_citation_count: 100,
            ..ScholarlyFilters::default()
        };
        assert_eq!(
            SemanticScholarAdapter::build_advanced_query(&filters),
            "title:\"attention\" AND (authors:\"Vaswani\") AND year:2017- AND citationCount:100-"
        );

        let to_only = ScholarlyFilters {
            year_to: Some(2020),
            ..ScholarlyFilters::default()
        };
        assert_eq!(SemanticScholarAdapter::build_advanced_query(&to_only), "year:-2020");
    }

    #[test]
    fn test_extract_id_from_url() {
        let url = "https://www.semanticscholar.org/paper/Attention-Is-All/\
                   649def34f8be52c8b66281af98ae884c09aef38b";
        assert_eq!(
            extract_semantic_scholar_id(url).as_deref(),
            Some("649def34f8be52c8b66281af98ae884c09aef38b")
        );
        assert_eq!(extract_semantic_scholar_id("https://example.org/x"), None);
    }

    #[test]
    fn test_debug_hides_key() {
        let config = Config::new(
            Some("s2-secret-key".to_string()),
            crate::providers::ProviderConfig::default(),
        );
        let adapter = SemanticScholarAdapter::new(HttpClient::new(&config).unwrap(), &config);
        assert!(!format!("{adapter:?}").contains("s2-secret-key"));
    }
}
