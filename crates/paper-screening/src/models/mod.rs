//! Data models: canonical records, backend wire types and analysis results.
//!
//! Wire types use `#[serde(default)]` for optional fields and
//! `#[serde(rename_all = "camelCase")]` to match upstream naming.

mod analysis;
mod content;
mod query;
mod record;
mod semantic_scholar;

pub use analysis::{
    AnalysisOrigin, AnalysisPayload, AnalysisResult, AnalysisVariant, ExtendedAnalysis, Score,
};
pub use content::{ContentBody, EnrichedContent};
pub use query::{ArxivFilters, ScholarlyFilters, SearchQuery, SortBy, SortOrder};
pub use record::{
    Author, PaperRecord, RawAuthor, RawRecord, SourceId, UnknownSource, derive_id, parse_timestamp,
};
pub use semantic_scholar::{
    AuthorProfile, ExternalIds, OpenAccessPdf, PaperPage, PaperRef, S2Author, S2AuthorProfile,
    S2CitationEdge, S2CitationPage, S2Paper, S2SearchResult,
};
