//! Source adapters: one per backend, all producing canonical records.

mod arxiv;
mod page;
mod scholar;
mod semantic_scholar;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::client::HttpClient;
use crate::config::Config;
use crate::error::PipelineResult;
use crate::models::{PaperRecord, RawRecord, SearchQuery, SortBy, SortOrder, SourceId};

pub use arxiv::{ArxivAdapter, extract_arxiv_id, parse_atom_feed};
pub use page::{PageMetadata, parse_landing_page};
pub use scholar::{ScholarAdapter, parse_scholar_results};
pub use semantic_scholar::{SemanticScholarAdapter, extract_semantic_scholar_id};

/// Backend adapter contract.
///
/// Adapters never retry; transient-failure policy belongs to the HTTP layer
/// configured by the caller.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Backend identity.
    fn id(&self) -> SourceId;

    /// Run a keyword search.
    async fn search(&self, query: &SearchQuery) -> PipelineResult<Vec<PaperRecord>>;

    /// Whether `id` is an identifier this backend can resolve.
    fn supports(&self, id: &str) -> bool;

    /// Resolve one record by identifier.
    async fn get_by_id(&self, id: &str) -> PipelineResult<Option<PaperRecord>>;
}

/// Build every searchable adapter in default enablement order.
#[must_use]
pub fn default_adapters(http: &HttpClient, config: &Config) -> Vec<Arc<dyn SourceAdapter>> {
    vec![
        Arc::new(ArxivAdapter::new(http.clone(), config)),
        Arc::new(SemanticScholarAdapter::new(http.clone(), config)),
        Arc::new(ScholarAdapter::new(http.clone(), config)),
    ]
}

/// Normalize raw backend output, drop empty records, order and cap.
///
/// Records carrying quality warnings are kept and logged.
pub(crate) fn finalize(raw: Vec<RawRecord>, query: &SearchQuery) -> Vec<PaperRecord> {
    let mut records: Vec<PaperRecord> =
        raw.into_iter().filter_map(RawRecord::into_record).collect();
    match query.sort_by {
        Some(SortBy::Relevance) => {}
        _ => sort_by_recency(&mut records, query.sort_order.unwrap_or_default()),
    }
    records.truncate(query.max_results);

    for record in records.iter().filter(|r| !r.warnings.is_empty()) {
        tracing::warn!(
            source = %record.source,
            paper = %record.id,
            warnings = ?record.warnings,
            "record has quality warnings"
        );
    }
    records
}

/// Stable sort on (updated, published); records without dates sort last.
pub fn sort_by_recency(records: &mut [PaperRecord], order: SortOrder) {
    records.sort_by(|a, b| {
        let ordering = recency_key(a).cmp(&recency_key(b));
        match order {
            SortOrder::Descending => ordering.reverse(),
            SortOrder::Ascending => ordering,
        }
    });
}

fn recency_key(record: &PaperRecord) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    (record.recency(), record.published)
}
