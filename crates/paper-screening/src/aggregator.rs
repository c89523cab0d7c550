//! Search aggregator: fan a query out to enabled adapters.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;

use crate::error::{ErrorKind, Failure, PipelineError, PipelineResult};
use crate::models::{PaperRecord, SearchQuery, SourceId};
use crate::sources::SourceAdapter;

/// How an aggregate search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchStatus {
    /// At least one record was returned.
    Found,
    /// Some source answered, but nothing matched.
    NoResults,
    /// Every enabled source failed.
    AllSourcesFailed,
}

/// Records plus the structured status of the search that produced them.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateOutcome {
    /// Concatenated records in enablement order, capped.
    pub papers: Vec<PaperRecord>,
    /// Overall outcome.
    pub status: SearchStatus,
    /// Per-source failures that were absorbed.
    pub errors: Vec<(SourceId, Failure)>,
}

impl AggregateOutcome {
    /// Failure value for a search that produced nothing.
    #[must_use]
    pub fn failure(&self) -> Option<Failure> {
        match self.status {
            SearchStatus::Found => None,
            SearchStatus::NoResults => Some(Failure::new(
                ErrorKind::NoResults,
                "no papers matched the query",
            )),
            SearchStatus::AllSourcesFailed => {
                let detail = self
                    .errors
                    .iter()
                    .map(|(source, f)| format!("{source}: {}", f.message))
                    .collect::<Vec<_>>();
                Some(Failure::new(
                    ErrorKind::SourceUnavailable,
                    format!("all sources failed ({})", detail.join("; ")),
                ))
            }
        }
    }
}

/// Runs adapters concurrently, each under its own timeout.
#[derive(Clone)]
pub struct SearchAggregator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    timeout: Duration,
}

impl SearchAggregator {
    /// Create an aggregator over `adapters` in default enablement order.
    #[must_use]
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, timeout: Duration) -> Self {
        Self { adapters, timeout }
    }

    /// Sources this aggregator can reach.
    #[must_use]
    pub fn sources(&self) -> Vec<SourceId> {
        self.adapters.iter().map(|a| a.id()).collect()
    }

    /// Search the enabled sources.
    ///
    /// `enabled` sets both the subset and the enablement order. Unknown or
    /// duplicated entries are ignored.
    pub async fn aggregate(&self, query: &SearchQuery, enabled: &[SourceId]) -> AggregateOutcome {
        let mut selected: Vec<&Arc<dyn SourceAdapter>> = Vec::new();
        for source in enabled {
            if selected.iter().any(|a| a.id() == *source) {
                continue;
            }
            if let Some(adapter) = self.adapters.iter().find(|a| a.id() == *source) {
                selected.push(adapter);
            }
        }

        let calls = selected.iter().map(|adapter| async move {
            let source = adapter.id();
            let result = match tokio::time::timeout(self.timeout, adapter.search(query)).await {
                Ok(result) => result,
                Err(_) => Err(PipelineError::source_unavailable(
                    source,
                    format!("search timed out after {:?}", self.timeout),
                )),
            };
            (source, result)
        });

        let mut papers = Vec::new();
        let mut errors = Vec::new();
        for (source, result) in join_all(calls).await {
            match result {
                Ok(records) => {
                    tracing::debug!(source = %source, count = records.len(), "source returned");
                    papers.extend(records);
                }
                Err(e) => {
                    tracing::warn!(
                        source = %source,
                        error = %e,
                        "source failed, excluding from results"
                    );
                    errors.push((source, e.to_failure()));
                }
            }
        }
        papers.truncate(query.max_results);

        let status = if !papers.is_empty() {
            SearchStatus::Found
        } else if !selected.is_empty() && errors.len() == selected.len() {
            SearchStatus::AllSourcesFailed
        } else {
            SearchStatus::NoResults
        };

        tracing::info!(
            keywords = %query.keywords,
            sources = selected.len(),
            papers = papers.len(),
            failed = errors.len(),
            "aggregate search complete"
        );
        AggregateOutcome {
            papers,
            status,
            errors,
        }
    }

    /// Resolve an identifier through the first adapter that recognizes it.
    ///
    /// Returns `Ok(None)` when no adapter supports the identifier.
    pub async fn get_by_id(&self, id: &str) -> PipelineResult<Option<PaperRecord>> {
        match self.adapters.iter().find(|a| a.supports(id)) {
            Some(adapter) => {
                tracing::debug!(source = %adapter.id(), id, "resolving identifier");
                adapter.get_by_id(id).await
            }
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for SearchAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchAggregator")
            .field("sources", &self.sources())
            .field("timeout", &self.timeout)
            .finish()
    }
}
