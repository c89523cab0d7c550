//! End-to-end pipeline tests: search, analyze, persist and export.
#![allow(clippy::needless_pass_by_value)]

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use paper_screening::analysis::finalize_payload;
use paper_screening::config::Config;
use paper_screening::error::ErrorKind;
use paper_screening::export::ExportFormat;
use paper_screening::models::{
    AnalysisOrigin, AnalysisResult, AnalysisVariant, RawAuthor, RawRecord, SearchQuery, SourceId,
};
use paper_screening::providers::{ProviderConfig, ProviderKind};
use paper_screening::store::{HISTORY_COLLECTION, JsonFileStore, KeyValueStore, MemoryStore};
use paper_screening::{
    AnalysisEngine, AnalyzeOptions, ContentReader, HttpClient, Pipeline, ScreeningRequest,
    SearchAggregator, SearchStatus,
};

/// Distinct papers, one per day of the fixture feed.
const TOPICS: [(&str, &str); 8] = [
    (
        "Tool Use in Language Agents",
        "Language agents call external calculators and search engines during planning.",
    ),
    (
        "Retrieval Augmented Code Generation",
        "Repository snippets are fetched before synthesis to ground generated programs.",
    ),
    (
        "Curriculum Learning for Robot Grasping",
        "Grippers practice easy objects first, then cluttered bins of household items.",
    ),
    (
        "Sparse Attention for Long Documents",
        "Blockwise attention patterns let transformers read whole books efficiently.",
    ),
    (
        "Federated Training Under Label Noise",
        "Hospitals share gradients while corrupted annotations are down-weighted locally.",
    ),
    (
        "Graph Networks for Molecule Property Prediction",
        "Message passing over atoms predicts solubility and toxicity for drug screening.",
    ),
    (
        "Speech Recognition for Low Resource Dialects",
        "Self-supervised audio pretraining transfers to regional dialects with little data.",
    ),
    (
        "Causal Discovery From Observational Health Records",
        "Structure learning recovers treatment effects from longitudinal patient charts.",
    ),
];

fn atom_entry(day: u32) -> String {
    let (title, summary) = TOPICS[(day as usize - 1) % TOPICS.len()];
    format!(
        r#"<entry>
    <id>http://arxiv.org/abs/2406.{day:05}v1</id>
    <published>2024-06-{day:02}T08:00:00Z</published>
    <updated>2024-06-{day:02}T08:00:00Z</updated>
    <title>{title}</title>
    <summary>{summary}</summary>
    <author><name>Author {day}</name></author>
  </entry>"#
    )
}

fn atom_feed(days: impl IntoIterator<Item = u32>) -> String {
    let entries: String = days.into_iter().map(atom_entry).collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><feed xmlns="http://www.w3.org/2005/Atom">{entries}</feed>"#
    )
}

async fn arxiv_server(count: u32) -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/query"))
        .respond_with(ResponseTemplate::new(200).set_body_string(atom_feed(1..=count)))
        .mount(&mock_server)
        .await;
    mock_server
}

fn request(keywords: &str, max: usize) -> ScreeningRequest {
    ScreeningRequest {
        query: SearchQuery::new(keywords, max),
        sources: vec![SourceId::Arxiv],
        options: AnalyzeOptions::default(),
    }
}

fn pipeline_with(config: &Config, backend: Arc<dyn KeyValueStore>) -> Pipeline {
    let http = HttpClient::new(config).unwrap();
    let adapters = paper_screening::sources::default_adapters(&http, config);
    Pipeline::from_parts(
        SearchAggregator::new(adapters, config.source_timeout),
        ContentReader::new(http.clone(), config),
        AnalysisEngine::new(http, config),
        backend,
        config,
    )
}

// =============================================================================
// Screening runs
// =============================================================================

#[tokio::test]
async fn test_screen_analyzes_and_stores_results() {
    let mock_server = arxiv_server(3).await;
    let config = Config::for_testing(&mock_server.uri());
    let pipeline = Pipeline::new(&config).unwrap();

    let report = pipeline.screen(&request("agent benchmark", 10)).await.unwrap();

    assert_eq!(report.status, SearchStatus::Found);
    assert!(report.failure.is_none());
    assert_eq!(report.results.len(), 3);
    assert_eq!(report.stored, 3);
    assert!(report.results.iter().all(|r| r.error.is_none()));
    let analysis = report.results[0].analysis.as_ref().unwrap();
    assert_eq!(analysis.origin, AnalysisOrigin::RuleBased);
    assert_eq!(report.results[0].paper.title, TOPICS[2].0);
    assert_eq!(report.duplicates_skipped, 0);

    assert_eq!(pipeline.get_history().unwrap(), report.results);
}

#[tokio::test]
async fn test_screen_with_no_results_reports_failure() {
    let mock_server = arxiv_server(0).await;
    let config = Config::for_testing(&mock_server.uri());
    let pipeline = Pipeline::new(&config).unwrap();

    let report = pipeline.screen(&request("nothing matches", 10)).await.unwrap();

    assert_eq!(report.status, SearchStatus::NoResults);
    assert_eq!(report.failure.unwrap().kind, ErrorKind::NoResults);
    assert!(report.results.is_empty());
    assert!(pipeline.get_history().unwrap().is_empty());
}

#[tokio::test]
async fn test_screen_when_every_source_fails() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let config = Config::for_testing(&mock_server.uri());
    let pipeline = Pipeline::new(&config).unwrap();
    let mut all_sources = request("agents", 5);
    all_sources.sources = SourceId::searchable().to_vec();

    let report = pipeline.screen(&all_sources).await.unwrap();

    assert_eq!(report.status, SearchStatus::AllSourcesFailed);
    assert_eq!(report.source_errors.len(), 3);
    assert_eq!(report.failure.unwrap().kind, ErrorKind::SourceUnavailable);
}

#[tokio::test]
async fn test_degraded_analysis_is_recorded_on_result() {
    let mock_server = arxiv_server(1).await;
    Mock::given(method("POST"))
        .and(path("/provider/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let key = Some("sk-test-1234567890".to_string());
    let provider = ProviderConfig::new(ProviderKind::OpenAi, key);
    let config = Config::for_testing(&mock_server.uri()).with_provider(provider);
    let pipeline = Pipeline::new(&config).unwrap();

    let report = pipeline.screen(&request("agents", 5)).await.unwrap();

    let result = &report.results[0];
    assert_eq!(result.analysis.as_ref().unwrap().origin, AnalysisOrigin::RuleBased);
    assert_eq!(result.error.as_ref().unwrap().kind, ErrorKind::ProviderCallFailure);
}

#[tokio::test]
async fn test_enriched_batch_reads_content_first() {
    let mock_server = arxiv_server(1).await;
    let config = Config::for_testing(&mock_server.uri());
    let pipeline = Pipeline::new(&config).unwrap();

    let outcome = pipeline
        .aggregate_search(&SearchQuery::new("agents", 5), &[SourceId::Arxiv])
        .await;
    let options = AnalyzeOptions {
        enrich: true,
        variant: AnalysisVariant::Extended,
    };
    let results = pipeline.analyze_batch(&outcome.papers, options).await;

    assert_eq!(results.len(), 1);
    assert!(results[0].analysis.as_ref().unwrap().extended.is_some());
    assert_eq!(pipeline.reader().cache_stats().size, 1);
    assert_eq!(pipeline.engine().cache_size(), 1);
}

// =============================================================================
// History
// =============================================================================

#[tokio::test]
async fn test_history_is_capped_oldest_first() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/query"))
        .and(query_param("search_query", "all:first run"))
        .respond_with(ResponseTemplate::new(200).set_body_string(atom_feed(1..=4)))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/query"))
        .and(query_param("search_query", "all:second run"))
        .respond_with(ResponseTemplate::new(200).set_body_string(atom_feed(5..=8)))
        .mount(&mock_server)
        .await;
    let mut config = Config::for_testing(&mock_server.uri());
    config.max_history = 5;
    let pipeline = Pipeline::new(&config).unwrap();

    pipeline.screen(&request("first run", 10)).await.unwrap();
    let second = pipeline.screen(&request("second run", 10)).await.unwrap();

    assert_eq!(second.stored, 5);
    let history = pipeline.get_history().unwrap();
    assert_eq!(history.len(), 5);
    assert_eq!(&history[1..], &second.results[..]);
}

#[tokio::test]
async fn test_rescreening_skips_papers_already_in_history() {
    let mock_server = arxiv_server(3).await;
    let config = Config::for_testing(&mock_server.uri());
    let pipeline = Pipeline::new(&config).unwrap();

    let first = pipeline.screen(&request("agents", 10)).await.unwrap();
    let second = pipeline.screen(&request("agents", 10)).await.unwrap();

    assert_eq!(second.status, SearchStatus::Found);
    assert!(second.results.is_empty());
    assert_eq!(second.duplicates_skipped, 3);
    assert_eq!(second.stored, 3);
    assert_eq!(pipeline.get_history().unwrap(), first.results);
}

#[tokio::test]
async fn test_same_paper_from_two_sources_keeps_the_richer_record() {
    let title = "Tool Use in Language Agents";
    let summary = "Language agents call external calculators and search engines during \
                   planning, and we measure how often the calls change the final answer.";

    let mock_server = MockServer::start().await;
    let feed = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><feed xmlns="http://www.w3.org/2005/Atom"><entry>
    <id>http://arxiv.org/abs/2406.00001v1</id>
    <published>2024-06-01T08:00:00Z</published>
    <updated>2024-06-01T08:00:00Z</updated>
    <title>{title}</title>
    <summary>{summary}</summary>
    <author><name>Ada Lovelace</name></author>
  </entry></feed>"#
    );
    Mock::given(method("GET"))
        .and(path("/api/query"))
        .respond_with(ResponseTemplate::new(200).set_body_string(feed))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 1,
            "offset": 0,
            "data": [{
                "paperId": "abc123",
                "title": title,
                "abstract": summary,
                "year": 2024,
                "citationCount": 500,
                "externalIds": {"DOI": "10.1000/tools.2024"},
                "authors": [{"authorId": "1", "name": "Ada Lovelace"}]
            }]
        })))
        .mount(&mock_server)
        .await;

    let config = Config::for_testing(&mock_server.uri());
    let pipeline = Pipeline::new(&config).unwrap();
    let mut both = request("tool use", 10);
    both.sources = vec![SourceId::Arxiv, SourceId::SemanticScholar];

    let report = pipeline.screen(&both).await.unwrap();

    assert_eq!(report.duplicates_skipped, 1);
    assert_eq!(report.results.len(), 1);
    let paper = &report.results[0].paper;
    assert_eq!(paper.source, SourceId::SemanticScholar);
    assert_eq!(paper.doi.as_deref(), Some("10.1000/tools.2024"));
    assert_eq!(report.stored, 1);
}

#[tokio::test]
async fn test_delete_result_and_status() {
    let mock_server = arxiv_server(2).await;
    let config = Config::for_testing(&mock_server.uri());
    let pipeline = Pipeline::new(&config).unwrap();

    let report = pipeline.screen(&request("agents", 10)).await.unwrap();
    let target = report.results[0].id;

    assert!(pipeline.delete_result(target).unwrap());
    assert!(!pipeline.delete_result(target).unwrap());

    let status = pipeline.status().unwrap();
    assert_eq!(status.provider, ProviderKind::RuleBased);
    assert_eq!(status.history_len, 1);
    assert_eq!(status.history_cap, config.max_history);
    assert_eq!(status.sources, SourceId::searchable().to_vec());
    assert!(status.recent[0].message.contains("deleted result"));
}

#[tokio::test]
async fn test_history_survives_restart_on_disk() {
    let mock_server = arxiv_server(2).await;
    let dir = tempfile::tempdir().unwrap();
    let config = Config::for_testing(&mock_server.uri()).with_data_dir(dir.path());

    let stored = {
        let pipeline = Pipeline::new(&config).unwrap();
        pipeline.screen(&request("agents", 10)).await.unwrap().results
    };

    assert!(dir.path().join(format!("{HISTORY_COLLECTION}.json")).exists());
    let reopened = Pipeline::new(&config).unwrap();
    assert_eq!(reopened.get_history().unwrap(), stored);
    assert!(!reopened.status().unwrap().recent.is_empty());
}

#[tokio::test]
async fn test_corrupt_history_surfaces_storage_failure() {
    let mock_server = arxiv_server(1).await;
    let dir = tempfile::tempdir().unwrap();
    let history_file = dir.path().join(format!("{HISTORY_COLLECTION}.json"));
    std::fs::write(history_file, "{ not json").unwrap();

    let config = Config::for_testing(&mock_server.uri());
    let pipeline = pipeline_with(&config, Arc::new(JsonFileStore::new(dir.path())));

    let err = pipeline.screen(&request("agents", 5)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StorageFailure);
    assert_eq!(pipeline.status().unwrap_err().kind(), ErrorKind::StorageFailure);
}

// =============================================================================
// Export
// =============================================================================

#[tokio::test]
async fn test_json_export_reads_back_as_history() {
    let mock_server = arxiv_server(2).await;
    let config = Config::for_testing(&mock_server.uri());
    let pipeline = pipeline_with(&config, Arc::new(MemoryStore::new()));

    pipeline.screen(&request("agents", 10)).await.unwrap();
    let exported = pipeline.export_history(ExportFormat::Json).unwrap();

    let decoded: Vec<AnalysisResult> = serde_json::from_str(&exported).unwrap();
    assert_eq!(decoded, pipeline.get_history().unwrap());
}

#[tokio::test]
#[allow(clippy::float_cmp)]
async fn test_provider_confidence_survives_json_export() {
    let config = Config::for_testing("http://127.0.0.1:9");
    let pipeline = pipeline_with(&config, Arc::new(MemoryStore::new()));

    let paper = RawRecord {
        title: Some("Sparse Attention for Long Documents".to_string()),
        r#abstract: Some(
            "Blockwise attention patterns let transformers read whole books efficiently, \
             and the method matches dense attention on retrieval benchmarks."
                .to_string(),
        ),
        authors: vec![RawAuthor::from("Grace Hopper")],
        ..RawRecord::new(SourceId::Generic)
    }
    .into_record()
    .unwrap();
    let fields = json!({"summary": "Short.", "keyPoints": ["blockwise attention"]});
    let payload = finalize_payload(
        fields.as_object().unwrap().clone(),
        &paper,
        AnalysisOrigin::Provider,
        AnalysisVariant::Standard,
    );
    assert_eq!(payload.confidence, 1.0);

    pipeline
        .save_results(vec![AnalysisResult::new(paper, payload, None)])
        .unwrap();
    let exported = pipeline.export_history(ExportFormat::Json).unwrap();
    let decoded: Vec<AnalysisResult> = serde_json::from_str(&exported).unwrap();
    assert_eq!(decoded, pipeline.get_history().unwrap());
}

#[tokio::test]
async fn test_csv_and_bibtex_export() {
    let mock_server = arxiv_server(1).await;
    let config = Config::for_testing(&mock_server.uri());
    let pipeline = Pipeline::new(&config).unwrap();

    pipeline.screen(&request("agents", 10)).await.unwrap();

    let csv = pipeline.export_history(ExportFormat::Csv).unwrap();
    let mut lines = csv.lines();
    assert!(lines.next().unwrap().starts_with("Title,Authors,Year"));
    let first_row = lines.next().unwrap();
    assert!(first_row.starts_with("Tool Use in Language Agents,Author 1,2024,arxiv"));

    let bibtex = pipeline.export_history(ExportFormat::Bibtex).unwrap();
    assert!(bibtex.starts_with("@article{2406.00001v1,"));
    assert!(bibtex.contains("title = {Tool Use in Language Agents}"));
}

#[tokio::test]
async fn test_external_results_can_be_saved() {
    let config = Config::for_testing("http://127.0.0.1:9");
    let pipeline = pipeline_with(&config, Arc::new(MemoryStore::new()));

    let paper = RawRecord {
        title: Some("Offline Paper".to_string()),
        ..RawRecord::new(SourceId::Generic)
    }
    .into_record()
    .unwrap();
    let results = pipeline.analyze_batch(&[paper], AnalyzeOptions::default()).await;

    assert_eq!(pipeline.save_results(results.clone()).unwrap(), 1);
    assert_eq!(pipeline.get_history().unwrap(), results);
}
