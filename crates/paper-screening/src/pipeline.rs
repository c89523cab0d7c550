//! Pipeline facade: search, analyze, persist.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::aggregator::{AggregateOutcome, SearchAggregator, SearchStatus};
use crate::analysis::AnalysisEngine;
use crate::client::HttpClient;
use crate::config::Config;
use crate::error::{Failure, PipelineResult};
use crate::export::{ExportFormat, export_results};
use crate::models::{AnalysisResult, AnalysisVariant, PaperRecord, SearchQuery, SourceId};
use crate::providers::ProviderKind;
use crate::reader::{CacheStats, ContentReader};
use crate::sources::default_adapters;
use crate::store::{
    JsonFileStore, KeyValueStore, MemoryStore, ResultStore, StatusEntry, StatusLevel, StatusLog,
};
use crate::text::{self, DUPLICATE_THRESHOLD};

/// Per-batch analysis options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalyzeOptions {
    /// Read source content before analysis.
    pub enrich: bool,
    /// Prompt schema.
    pub variant: AnalysisVariant,
}

/// A full screening run.
#[derive(Debug, Clone)]
pub struct ScreeningRequest {
    /// Search query.
    pub query: SearchQuery,
    /// Sources in enablement order.
    pub sources: Vec<SourceId>,
    /// Analysis options.
    pub options: AnalyzeOptions,
}

/// What a screening run produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningReport {
    /// Search outcome.
    pub status: SearchStatus,
    /// New results, in search order.
    pub results: Vec<AnalysisResult>,
    /// Candidates dropped as near-duplicates of history or of each other.
    pub duplicates_skipped: usize,
    /// Absorbed per-source failures.
    pub source_errors: Vec<(SourceId, Failure)>,
    /// Set when nothing was found.
    pub failure: Option<Failure>,
    /// History length after persisting.
    pub stored: usize,
}

/// Snapshot of pipeline state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStatus {
    /// Configured AI provider.
    pub provider: ProviderKind,
    /// Searchable sources.
    pub sources: Vec<SourceId>,
    /// Stored results.
    pub history_len: usize,
    /// History cap.
    pub history_cap: usize,
    /// Content reader cache.
    pub content_cache: CacheStats,
    /// Cached analyses.
    pub analysis_cache_size: usize,
    /// Recent activity, newest first.
    pub recent: Vec<StatusEntry>,
}

/// Owns every pipeline component. Create once and share by reference.
#[derive(Debug)]
pub struct Pipeline {
    aggregator: SearchAggregator,
    reader: ContentReader,
    engine: AnalysisEngine,
    results: ResultStore,
    status: StatusLog,
}

impl Pipeline {
    /// Build the pipeline from configuration.
    ///
    /// Persists under `config.data_dir` when set, in memory otherwise.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = HttpClient::new(config)?;
        let backend: Arc<dyn KeyValueStore> = match &config.data_dir {
            Some(dir) => Arc::new(JsonFileStore::new(dir)),
            None => Arc::new(MemoryStore::new()),
        };

        tracing::info!(
            provider = ?config.provider.kind,
            model = %config.provider.model,
            persistent = config.data_dir.is_some(),
            "pipeline ready"
        );

        Ok(Self::from_parts(
            SearchAggregator::new(default_adapters(&http, config), config.source_timeout),
            ContentReader::new(http.clone(), config),
            AnalysisEngine::new(http, config),
            backend,
            config,
        ))
    }

    /// Assemble a pipeline from prebuilt components.
    #[must_use]
    pub fn from_parts(
        aggregator: SearchAggregator,
        reader: ContentReader,
        engine: AnalysisEngine,
        backend: Arc<dyn KeyValueStore>,
        config: &Config,
    ) -> Self {
        Self {
            aggregator,
            reader,
            engine,
            results: ResultStore::new(Arc::clone(&backend), config.max_history),
            status: StatusLog::new(backend, config.max_status_entries),
        }
    }

    /// Content reader.
    #[must_use]
    pub const fn reader(&self) -> &ContentReader {
        &self.reader
    }

    /// Analysis engine.
    #[must_use]
    pub const fn engine(&self) -> &AnalysisEngine {
        &self.engine
    }

    /// Search the enabled sources.
    pub async fn aggregate_search(
        &self,
        query: &SearchQuery,
        sources: &[SourceId],
    ) -> AggregateOutcome {
        let outcome = self.aggregator.aggregate(query, sources).await;
        match outcome.failure() {
            None => self.note(
                StatusLevel::Info,
                format!(
                    "found {} papers for \"{}\"",
                    outcome.papers.len(),
                    query.keywords
                ),
            ),
            Some(failure) => self.note(
                StatusLevel::Warn,
                format!("search \"{}\": {failure}", query.keywords),
            ),
        }
        outcome
    }

    /// Resolve one paper by identifier.
    pub async fn lookup(&self, id: &str) -> PipelineResult<Option<PaperRecord>> {
        self.aggregator.get_by_id(id).await
    }

    /// Analyze papers one at a time.
    ///
    /// Never fails: degraded analyses carry their reason in `error`.
    pub async fn analyze_batch(
        &self,
        papers: &[PaperRecord],
        options: AnalyzeOptions,
    ) -> Vec<AnalysisResult> {
        let mut results = Vec::with_capacity(papers.len());
        for (index, paper) in papers.iter().enumerate() {
            tracing::debug!(index, total = papers.len(), paper = %paper.id, "analyzing");
            let content = if options.enrich {
                Some(self.reader.read(paper).await)
            } else {
                None
            };
            let (payload, failure) = self
                .engine
                .analyze_detailed(paper, content.as_ref(), options.variant)
                .await;
            results.push(AnalysisResult::new(paper.clone(), payload, failure));
        }

        let degraded = results.iter().filter(|r| r.error.is_some()).count();
        tracing::info!(papers = results.len(), degraded, "batch analysis complete");
        self.note(
            StatusLevel::Info,
            format!("analyzed {} papers ({degraded} degraded)", results.len()),
        );
        results
    }

    /// Search, analyze and persist.
    ///
    /// Papers already in history are not analyzed again, and of two
    /// near-duplicate candidates only the more complete one is kept. Only
    /// storage failures are errors; an empty search is reported in
    /// [`ScreeningReport::failure`].
    pub async fn screen(&self, request: &ScreeningRequest) -> PipelineResult<ScreeningReport> {
        let outcome = self.aggregate_search(&request.query, &request.sources).await;
        if let Some(failure) = outcome.failure() {
            return Ok(ScreeningReport {
                status: outcome.status,
                results: Vec::new(),
                duplicates_skipped: 0,
                source_errors: outcome.errors,
                failure: Some(failure),
                stored: self.results.list()?.len(),
            });
        }

        let history: Vec<PaperRecord> = self
            .results
            .list()?
            .into_iter()
            .map(|r| r.paper)
            .collect();
        let (papers, duplicates_skipped) = drop_duplicates(outcome.papers, &history);
        if duplicates_skipped > 0 {
            self.note(
                StatusLevel::Info,
                format!("skipped {duplicates_skipped} duplicate papers"),
            );
        }

        let results = self.analyze_batch(&papers, request.options).await;
        let stored = match self.results.append(results.clone()) {
            Ok(stored) => stored,
            Err(e) => {
                self.note(StatusLevel::Error, format!("saving results failed: {e}"));
                return Err(e);
            }
        };

        Ok(ScreeningReport {
            status: outcome.status,
            results,
            duplicates_skipped,
            source_errors: outcome.errors,
            failure: None,
            stored,
        })
    }

    /// Persist externally produced results.
    pub fn save_results(&self, results: Vec<AnalysisResult>) -> PipelineResult<usize> {
        self.results.append(results)
    }

    /// Stored results, oldest first.
    pub fn get_history(&self) -> PipelineResult<Vec<AnalysisResult>> {
        self.results.list()
    }

    /// Render the stored history.
    pub fn export_history(&self, format: ExportFormat) -> PipelineResult<String> {
        export_results(&self.results.list()?, format)
    }

    /// Delete one stored result.
    pub fn delete_result(&self, id: Uuid) -> PipelineResult<bool> {
        let deleted = self.results.delete(id)?;
        if deleted {
            self.note(StatusLevel::Info, format!("deleted result {id}"));
        }
        Ok(deleted)
    }

    /// Current pipeline state.
    pub fn status(&self) -> PipelineResult<PipelineStatus> {
        Ok(PipelineStatus {
            provider: self.engine.provider_kind(),
            sources: self.aggregator.sources(),
            history_len: self.results.list()?.len(),
            history_cap: self.results.max_results(),
            content_cache: self.reader.cache_stats(),
            analysis_cache_size: self.engine.cache_size(),
            recent: self.status.entries()?,
        })
    }

    fn note(&self, level: StatusLevel, message: String) {
        if let Err(e) = self.status.record(level, message) {
            tracing::warn!(error = %e, "status log write failed");
        }
    }
}

/// Remove candidates that repeat `history` and collapse near-duplicates
/// within the batch, keeping the record with the higher quality score.
///
/// Returns the kept records in first-seen order and the number dropped.
fn drop_duplicates(
    candidates: Vec<PaperRecord>,
    history: &[PaperRecord],
) -> (Vec<PaperRecord>, usize) {
    let mut kept: Vec<PaperRecord> = Vec::with_capacity(candidates.len());
    let mut skipped = 0;

    for paper in candidates {
        if let Some(dup) = text::find_duplicates(&paper, history, DUPLICATE_THRESHOLD).first() {
            tracing::debug!(
                paper = %paper.id,
                stored = %dup.paper.id,
                similarity = dup.similarity,
                "already screened"
            );
            skipped += 1;
            continue;
        }

        let twin = text::find_duplicates(&paper, &kept, DUPLICATE_THRESHOLD)
            .first()
            .map(|dup| dup.index);
        match twin {
            Some(index) => {
                skipped += 1;
                if text::quality_score(&paper) > text::quality_score(&kept[index]) {
                    tracing::debug!(
                        kept = %paper.id,
                        dropped = %kept[index].id,
                        "keeping more complete duplicate"
                    );
                    kept[index] = paper;
                }
            }
            None => kept.push(paper),
        }
    }

    (kept, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawAuthor, RawRecord};

    fn record(source: SourceId, title: &str, doi: Option<&str>, citations: u64) -> PaperRecord {
        RawRecord {
            title: Some(title.to_string()),
            r#abstract: Some(
                "Language agents that call external tools are evaluated on a broad benchmark \
                 of realistic tasks with automatic grading."
                    .to_string(),
            ),
            authors: vec![RawAuthor::from("Ada Lovelace")],
            year: Some(2024),
            doi: doi.map(str::to_string),
            citation_count: Some(citations),
            ..RawRecord::new(source)
        }
        .into_record()
        .unwrap()
    }

    #[test]
    fn test_batch_duplicates_keep_higher_quality() {
        let preprint = record(SourceId::Arxiv, "Tool Use Benchmark for Agents", None, 0);
        let published = record(
            SourceId::SemanticScholar,
            "Tool Use Benchmark for Agents",
            Some("10.1000/tools"),
            500,
        );
        let other = record(SourceId::Arxiv, "Unrelated Study of Protein Folding", None, 0);

        let (kept, skipped) = drop_duplicates(vec![preprint, other, published], &[]);
        assert_eq!(skipped, 1);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].source, SourceId::SemanticScholar);
        assert_eq!(kept[1].title, "Unrelated Study of Protein Folding");
    }

    #[test]
    fn test_history_duplicates_are_skipped() {
        let stored = record(SourceId::Arxiv, "Tool Use Benchmark for Agents", None, 0);
        let again = record(
            SourceId::SemanticScholar,
            "Tool Use Benchmark for Agents",
            Some("10.1000/tools"),
            500,
        );
        let (kept, skipped) = drop_duplicates(vec![again], &[stored]);
        assert!(kept.is_empty());
        assert_eq!(skipped, 1);
    }
}
