//! Search query types.

use serde::{Deserialize, Serialize};

use crate::config::api;

/// Sort criterion requested from a backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    /// Backend relevance ranking.
    Relevance,
    /// Most recent revision.
    #[default]
    LastUpdatedDate,
    /// First submission.
    SubmittedDate,
}

impl SortBy {
    /// arXiv `sortBy` parameter value.
    #[must_use]
    pub const fn as_arxiv(self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::LastUpdatedDate => "lastUpdatedDate",
            Self::SubmittedDate => "submittedDate",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Oldest first.
    Ascending,
    /// Newest first.
    #[default]
    Descending,
}

impl SortOrder {
    /// arXiv `sortOrder` parameter value.
    #[must_use]
    pub const fn as_arxiv(self) -> &'static str {
        match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
        }
    }
}

/// Query handed to every source adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Free-text keywords.
    pub keywords: String,

    /// Result cap (per adapter and for the aggregate).
    pub max_results: usize,

    /// Requested sort criterion.
    #[serde(default)]
    pub sort_by: Option<SortBy>,

    /// Requested sort direction.
    #[serde(default)]
    pub sort_order: Option<SortOrder>,
}

impl SearchQuery {
    /// Create a query with default ordering.
    #[must_use]
    pub fn new(keywords: impl Into<String>, max_results: usize) -> Self {
        Self {
            keywords: keywords.into(),
            max_results,
            sort_by: None,
            sort_order: None,
        }
    }

    /// Set the sort criterion and direction.
    #[must_use]
    pub const fn sorted(mut self, sort_by: SortBy, sort_order: SortOrder) -> Self {
        self.sort_by = Some(sort_by);
        self.sort_order = Some(sort_order);
        self
    }

    /// Result cap bounded to what a single backend request may ask for.
    #[must_use]
    pub fn capped_results(&self) -> usize {
        self.max_results.min(api::MAX_RESULTS_PER_SOURCE)
    }
}

/// Structured filters for building arXiv query strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArxivFilters {
    /// Keywords, combined with AND.
    pub keywords: Vec<String>,
    /// Authors, combined with OR.
    pub authors: Vec<String>,
    /// Categories (e.g. `cs.AI`), combined with OR.
    pub categories: Vec<String>,
    /// Title phrase.
    pub title: Option<String>,
    /// Earliest submission date (`YYYYMMDD`).
    pub date_from: Option<String>,
    /// Latest submission date (`YYYYMMDD`).
    pub date_to: Option<String>,
}

/// Structured filters for Semantic Scholar query strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScholarlyFilters {
    /// Title phrase.
    pub title: Option<String>,
    /// Authors, combined with OR.
    pub authors: Vec<String>,
    /// Abstract phrase.
    pub r#abstract: Option<String>,
    /// Venue name.
    pub venue: Option<String>,
    /// First year (inclusive).
    pub year_from: Option<i32>,
    /// Last year (inclusive).
    pub year_to: Option<i32>,
    /// Fields of study, combined with OR.
    pub fields_of_study: Vec<String>,
    /// Minimum citation count.
    pub min_citation_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_caps_backend_request() {
        assert_eq!(SearchQuery::new("x", 500).capped_results(), api::MAX_RESULTS_PER_SOURCE);
        assert_eq!(SearchQuery::new("x", 2).capped_results(), 2);
    }

    #[test]
    fn test_sort_defaults() {
        assert_eq!(SortBy::default().as_arxiv(), "lastUpdatedDate");
        assert_eq!(SortOrder::default().as_arxiv(), "descending");
    }
}
