//! Canonical paper record shared by every source adapter.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::text;

/// Keywords derived from title and abstract when a backend supplies none.
const MAX_DERIVED_KEYWORDS: usize = 10;

/// Backend a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    /// arXiv Atom API.
    Arxiv,
    /// Semantic Scholar Graph API.
    #[serde(rename = "semanticscholar")]
    SemanticScholar,
    /// Google Scholar result pages.
    Scholar,
    /// Any other landing page.
    Generic,
}

impl SourceId {
    /// Stable lowercase name used in keys and exports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Arxiv => "arxiv",
            Self::SemanticScholar => "semanticscholar",
            Self::Scholar => "scholar",
            Self::Generic => "generic",
        }
    }

    /// Every searchable source, in default enablement order.
    #[must_use]
    pub const fn searchable() -> [Self; 3] {
        [Self::Arxiv, Self::SemanticScholar, Self::Scholar]
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognized source names.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown source '{0}' (expected arxiv, semanticscholar, scholar or generic)")]
pub struct UnknownSource(pub String);

impl FromStr for SourceId {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arxiv" => Ok(Self::Arxiv),
            "semanticscholar" | "semantic-scholar" | "s2" => Ok(Self::SemanticScholar),
            "scholar" | "googlescholar" => Ok(Self::Scholar),
            "generic" => Ok(Self::Generic),
            other => Err(UnknownSource(other.to_string())),
        }
    }
}

/// A paper author in byline order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    /// Display name.
    pub name: String,

    /// Institutional affiliation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,

    /// Contact email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Author {
    /// Create an author with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            affiliation: None,
            email: None,
        }
    }
}

/// Normalized paper record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperRecord {
    /// Backend-native id, or a digest of title, authors and source.
    pub id: String,

    /// Whitespace-collapsed title (may be empty).
    pub title: String,

    /// Whitespace-collapsed abstract (may be empty).
    pub r#abstract: String,

    /// Authors in byline order.
    #[serde(default)]
    pub authors: Vec<Author>,

    /// Publication year.
    #[serde(default)]
    pub year: Option<i32>,

    /// Originating backend.
    pub source: SourceId,

    /// Landing page URL.
    #[serde(default)]
    pub url: String,

    /// Direct PDF link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,

    /// Digital Object Identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,

    /// Number of citations (0 when unknown).
    #[serde(default)]
    pub citation_count: u64,

    /// Journal or conference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,

    /// Subject categories (arXiv categories, fields of study).
    #[serde(default)]
    pub categories: BTreeSet<String>,

    /// Free keywords.
    #[serde(default)]
    pub keywords: BTreeSet<String>,

    /// First publication timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,

    /// Most recent revision timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,

    /// Non-fatal data quality problems found during normalization.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl PaperRecord {
    /// Author names joined with ", ".
    #[must_use]
    pub fn author_names(&self) -> String {
        self.authors
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// First author's name if any.
    #[must_use]
    pub fn first_author(&self) -> Option<&str> {
        self.authors.first().map(|a| a.name.as_str())
    }

    /// Timestamp used for newest-first ordering.
    #[must_use]
    pub fn recency(&self) -> Option<DateTime<Utc>> {
        self.updated.or(self.published)
    }
}

/// Author as delivered by a backend, before cleaning.
#[derive(Debug, Clone, Default)]
pub struct RawAuthor {
    /// Name as delivered.
    pub name: String,
    /// Affiliation as delivered.
    pub affiliation: Option<String>,
    /// Email as delivered.
    pub email: Option<String>,
}

impl From<&str> for RawAuthor {
    fn from(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

/// Backend output before normalization.
///
/// Adapters fill whatever they have and call [`RawRecord::into_record`]; the
/// cleaning, id derivation and date handling live in one place.
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// Originating backend.
    pub source: SourceId,
    /// Backend-native id.
    pub native_id: Option<String>,
    /// Title text.
    pub title: Option<String>,
    /// Abstract text.
    pub r#abstract: Option<String>,
    /// Authors (possibly with empty names).
    pub authors: Vec<RawAuthor>,
    /// Explicit year.
    pub year: Option<i32>,
    /// Publication date in any date-like format.
    pub published: Option<String>,
    /// Update date in any date-like format.
    pub updated: Option<String>,
    /// Landing page.
    pub url: Option<String>,
    /// PDF link.
    pub pdf_url: Option<String>,
    /// DOI.
    pub doi: Option<String>,
    /// Citation count.
    pub citation_count: Option<u64>,
    /// Venue.
    pub venue: Option<String>,
    /// Categories.
    pub categories: Vec<String>,
    /// Keywords.
    pub keywords: Vec<String>,
}

impl RawRecord {
    /// Empty raw record for a source.
    #[must_use]
    pub fn new(source: SourceId) -> Self {
        Self {
            source,
            native_id: None,
            title: None,
            r#abstract: None,
            authors: Vec::new(),
            year: None,
            published: None,
            updated: None,
            url: None,
            pdf_url: None,
            doi: None,
            citation_count: None,
            venue: None,
            categories: Vec::new(),
            keywords: Vec::new(),
        }
    }

    /// Normalize into a canonical record.
    ///
    /// Returns `None` when both the cleaned title and abstract are empty.
    /// Keywords are derived from the text when the backend sent none, and
    /// quality warnings are attached to the record.
    #[must_use]
    pub fn into_record(self) -> Option<PaperRecord> {
        let title = text::clean_text(self.title.as_deref().unwrap_or_default());
        let r#abstract = text::clean_text(self.r#abstract.as_deref().unwrap_or_default());
        if title.is_empty() && r#abstract.is_empty() {
            return None;
        }

        let authors: Vec<Author> = self
            .authors
            .into_iter()
            .filter_map(|a| {
                let name = text::clean_text(&a.name);
                (!name.is_empty()).then(|| Author {
                    name,
                    affiliation: clean_optional(a.affiliation),
                    email: a.email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty()),
                })
            })
            .collect();

        let published = self.published.as_deref().and_then(parse_timestamp);
        let updated = self.updated.as_deref().and_then(parse_timestamp);
        let year = self
            .year
            .or_else(|| self.published.as_deref().and_then(text::extract_year))
            .or_else(|| self.updated.as_deref().and_then(text::extract_year));
        // Year-only sources still need something to sort by.
        let published = published.or_else(|| year.and_then(start_of_year));

        let id = clean_optional(self.native_id)
            .unwrap_or_else(|| derive_id(&title, &authors, self.source));

        let keywords = if self.keywords.is_empty() {
            text::extract_keywords(&format!("{title} {abstract}"), MAX_DERIVED_KEYWORDS)
        } else {
            self.keywords
        };

        let mut record = PaperRecord {
            id,
            title,
            r#abstract,
            authors,
            year,
            source: self.source,
            url: self.url.map(|u| u.trim().to_string()).unwrap_or_default(),
            pdf_url: clean_optional(self.pdf_url),
            doi: clean_optional(self.doi),
            citation_count: self.citation_count.unwrap_or(0),
            venue: clean_optional(self.venue),
            categories: collect_set(self.categories),
            keywords: collect_set(keywords),
            published,
            updated,
            warnings: Vec::new(),
        };
        record.warnings = text::validate_paper(&record).warnings;
        Some(record)
    }
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value.map(|v| text::clean_text(&v)).filter(|v| !v.is_empty())
}

fn collect_set(values: Vec<String>) -> BTreeSet<String> {
    values
        .into_iter()
        .map(|v| text::clean_text(&v))
        .filter(|v| !v.is_empty())
        .collect()
}

/// Digest-based id for records whose backend has no stable identifier.
#[must_use]
pub fn derive_id(title: &str, authors: &[Author], source: SourceId) -> String {
    use md5::{Digest, Md5};

    let mut hasher = Md5::new();
    hasher.update(title.to_lowercase().as_bytes());
    hasher.update(b"|");
    for author in authors {
        hasher.update(author.name.to_lowercase().as_bytes());
        hasher.update(b";");
    }
    hasher.update(b"|");
    hasher.update(source.as_str().as_bytes());

    format!("{}-{:x}", source.as_str(), hasher.finalize())
}

/// Parse RFC 3339 timestamps or bare `YYYY-MM-DD` dates.
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        })
}

fn start_of_year(year: i32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
