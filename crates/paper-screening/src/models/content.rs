//! Enriched content produced by the content reader.

use serde::{Deserialize, Serialize};

use super::record::{Author, SourceId};
use crate::error::Failure;

/// Extra material fetched for one paper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBody {
    /// Title as shown on the source page.
    #[serde(default)]
    pub title: String,

    /// Abstract as shown on the source page.
    #[serde(default)]
    pub r#abstract: String,

    /// Authors.
    #[serde(default)]
    pub authors: Vec<Author>,

    /// Publication year.
    #[serde(default)]
    pub year: Option<i32>,

    /// Citation count.
    #[serde(default)]
    pub citation_count: u64,

    /// Titles of referenced papers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<String>>,

    /// Open access PDF link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_access_pdf: Option<String>,

    /// Page text (truncated).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
}

/// Result of a content read; failures are values, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedContent {
    /// Whether the fetch succeeded.
    pub success: bool,

    /// Source routine that produced the content.
    pub source: SourceId,

    /// Fetched material (empty on failure).
    #[serde(default)]
    pub content: ContentBody,

    /// URL that was read.
    pub url: String,

    /// Why the read failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Failure>,
}

impl EnrichedContent {
    /// Successful read.
    #[must_use]
    pub fn found(source: SourceId, url: impl Into<String>, content: ContentBody) -> Self {
        Self {
            success: true,
            source,
            content,
            url: url.into(),
            error: None,
        }
    }

    /// Failed read.
    #[must_use]
    pub fn failed(source: SourceId, url: impl Into<String>, error: Failure) -> Self {
        Self {
            success: false,
            source,
            content: ContentBody::default(),
            url: url.into(),
            error: Some(error),
        }
    }

    /// Whether there is anything worth putting in a prompt.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.success
            && (!self.content.r#abstract.is_empty()
                || self.content.full_text.as_deref().is_some_and(|t| !t.is_empty()))
    }
}
