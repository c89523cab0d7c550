//! Wire model for the Semantic Scholar Graph API.

use serde::{Deserialize, Serialize};

use super::record::{PaperRecord, RawAuthor, RawRecord, SourceId};

/// A paper as returned by `/paper/search` and `/paper/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S2Paper {
    /// Semantic Scholar paper ID.
    #[serde(default)]
    pub paper_id: Option<String>,

    /// Paper title.
    #[serde(default)]
    pub title: Option<String>,

    /// Paper abstract.
    #[serde(default)]
    pub r#abstract: Option<String>,

    /// Publication year.
    #[serde(default)]
    pub year: Option<i32>,

    /// Number of citations.
    #[serde(default)]
    pub citation_count: Option<i64>,

    /// Number of influential citations.
    #[serde(default)]
    pub influential_citation_count: Option<i64>,

    /// Fields of study (e.g., "Computer Science").
    #[serde(default)]
    pub fields_of_study: Option<Vec<String>>,

    /// Authors in byline order.
    #[serde(default)]
    pub authors: Vec<S2Author>,

    /// Journal or conference.
    #[serde(default)]
    pub venue: Option<String>,

    /// Publication date (YYYY-MM-DD).
    #[serde(default)]
    pub publication_date: Option<String>,

    /// Open access PDF information.
    #[serde(default)]
    pub open_access_pdf: Option<OpenAccessPdf>,

    /// External identifiers (DOI, ArXiv, ...).
    #[serde(default)]
    pub external_ids: Option<ExternalIds>,

    /// Landing page.
    #[serde(default)]
    pub url: Option<String>,

    /// Referenced papers (only when requested).
    #[serde(default)]
    pub references: Option<Vec<PaperRef>>,
}

impl S2Paper {
    /// Get the DOI if available.
    #[must_use]
    pub fn doi(&self) -> Option<&str> {
        self.external_ids.as_ref()?.doi.as_deref()
    }

    /// Get the open access PDF URL if available.
    #[must_use]
    pub fn pdf_url(&self) -> Option<&str> {
        self.open_access_pdf.as_ref()?.url.as_deref()
    }

    /// Get citation count or 0 if not available.
    #[must_use]
    pub fn citations(&self) -> u64 {
        non_negative(self.citation_count)
    }

    /// Convert into the pre-normalization record.
    #[must_use]
    pub fn into_raw(self) -> RawRecord {
        let doi = self.doi().map(str::to_string);
        let pdf_url = self.pdf_url().map(str::to_string);
        let citation_count = Some(self.citations());
        let url = self.url.or_else(|| {
            self.paper_id
                .as_ref()
                .map(|id| format!("https://www.semanticscholar.org/paper/{id}"))
        });

        RawRecord {
            native_id: self.paper_id,
            title: self.title,
            r#abstract: self.r#abstract,
            authors: self
                .authors
                .into_iter()
                .map(|a| RawAuthor {
                    name: a.name.unwrap_or_default(),
                    affiliation: a.affiliations.and_then(|list| list.into_iter().next()),
                    email: None,
                })
                .collect(),
            year: self.year,
            published: self.publication_date,
            url,
            pdf_url,
            doi,
            citation_count,
            venue: self.venue,
            categories: self.fields_of_study.unwrap_or_default(),
            ..RawRecord::new(SourceId::SemanticScholar)
        }
    }
}

/// Author reference embedded in a paper.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S2Author {
    /// Author ID.
    #[serde(default)]
    pub author_id: Option<String>,

    /// Display name.
    #[serde(default)]
    pub name: Option<String>,

    /// Affiliations (only when requested).
    #[serde(default)]
    pub affiliations: Option<Vec<String>>,
}

/// Minimal paper reference used in reference lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperRef {
    /// Paper ID.
    #[serde(default)]
    pub paper_id: Option<String>,

    /// Paper title.
    #[serde(default)]
    pub title: Option<String>,
}

/// Open access PDF information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAccessPdf {
    /// Direct URL to the PDF.
    #[serde(default)]
    pub url: Option<String>,

    /// Status of open access.
    #[serde(default)]
    pub status: Option<String>,
}

/// External identifiers for a paper.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalIds {
    /// Digital Object Identifier.
    #[serde(rename = "DOI", default)]
    pub doi: Option<String>,

    /// ArXiv preprint ID.
    #[serde(rename = "ArXiv", default)]
    pub arxiv: Option<String>,

    /// Semantic Scholar Corpus ID.
    #[serde(rename = "CorpusId", default)]
    pub corpus_id: Option<i64>,
}

/// Search result wrapper.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct S2SearchResult {
    /// Total number of matching papers.
    #[serde(default)]
    pub total: i64,

    /// Current offset in the result set.
    #[serde(default)]
    pub offset: i64,

    /// Next offset if more results are available.
    #[serde(default)]
    pub next: Option<i64>,

    /// Papers in this page.
    #[serde(default)]
    pub data: Vec<S2Paper>,
}

/// One edge of a citation or reference listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S2CitationEdge {
    /// The citing or cited paper.
    #[serde(alias = "citingPaper", alias = "citedPaper", default)]
    pub paper: Option<S2Paper>,

    /// Citation snippets.
    #[serde(default)]
    pub contexts: Vec<String>,

    /// Citation intents.
    #[serde(default)]
    pub intents: Vec<String>,

    /// Whether the citation is influential.
    #[serde(default)]
    pub is_influential: bool,
}

/// Page of `/paper/{id}/citations` or `/paper/{id}/references`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct S2CitationPage {
    /// Offset of this page.
    #[serde(default)]
    pub offset: i64,

    /// Next offset if more edges are available.
    #[serde(default)]
    pub next: Option<i64>,

    /// Edges in this page.
    #[serde(default)]
    pub data: Vec<S2CitationEdge>,
}

impl S2CitationPage {
    /// Normalize the linked papers, dropping empty ones.
    #[must_use]
    pub fn into_page(self) -> PaperPage {
        PaperPage {
            offset: non_negative(Some(self.offset)),
            next: self.next.and_then(|n| u64::try_from(n).ok()),
            papers: self
                .data
                .into_iter()
                .filter_map(|edge| edge.paper)
                .filter_map(|paper| paper.into_raw().into_record())
                .collect(),
        }
    }
}

/// Canonical page of linked papers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperPage {
    /// Offset of this page.
    pub offset: u64,

    /// Offset to request next, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<u64>,

    /// Papers in backend order.
    pub papers: Vec<PaperRecord>,
}

/// Author as returned by `/author/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S2AuthorProfile {
    /// Author ID.
    #[serde(default)]
    pub author_id: Option<String>,

    /// Display name.
    #[serde(default)]
    pub name: Option<String>,

    /// h-index.
    #[serde(default)]
    pub h_index: Option<i64>,

    /// Total citations.
    #[serde(default)]
    pub citation_count: Option<i64>,

    /// Number of papers.
    #[serde(default)]
    pub paper_count: Option<i64>,

    /// Papers (only when requested).
    #[serde(default)]
    pub papers: Vec<S2Paper>,
}

impl S2AuthorProfile {
    /// Convert into the canonical profile. `None` without an author id.
    #[must_use]
    pub fn into_profile(self) -> Option<AuthorProfile> {
        let author_id = self.author_id.filter(|id| !id.trim().is_empty())?;
        let papers: Vec<PaperRecord> = self
            .papers
            .into_iter()
            .filter_map(|paper| paper.into_raw().into_record())
            .collect();
        let paper_count = self
            .paper_count
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(papers.len() as u64);

        Some(AuthorProfile {
            author_id,
            name: self.name.unwrap_or_default(),
            h_index: self.h_index.and_then(|h| u64::try_from(h).ok()),
            citation_count: non_negative(self.citation_count),
            paper_count,
            papers,
        })
    }
}

/// Canonical author profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorProfile {
    /// Semantic Scholar author ID.
    pub author_id: String,

    /// Display name.
    pub name: String,

    /// h-index, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h_index: Option<u64>,

    /// Total citations.
    pub citation_count: u64,

    /// Number of papers.
    pub paper_count: u64,

    /// Papers, when requested.
    #[serde(default)]
    pub papers: Vec<PaperRecord>,
}

fn non_negative(value: Option<i64>) -> u64 {
    value.and_then(|v| u64::try_from(v).ok()).unwrap_or(0)
}
