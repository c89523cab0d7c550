//! Content reader tests using wiremock.
#![allow(clippy::needless_pass_by_value)]

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use paper_screening::config::Config;
use paper_screening::error::ErrorKind;
use paper_screening::models::{PaperRecord, RawRecord, SourceId};
use paper_screening::{ContentReader, HttpClient};

const S2_ID: &str = "649def34f8be52c8b66281af98ae884c09aef38b";

fn reader(mock_server: &MockServer) -> ContentReader {
    let config = Config::for_testing(&mock_server.uri());
    ContentReader::new(HttpClient::new(&config).unwrap(), &config)
}

fn record(source: SourceId, title: &str, url: &str) -> PaperRecord {
    RawRecord {
        title: Some(title.to_string()),
        r#abstract: Some("A short abstract.".to_string()),
        url: Some(url.to_string()),
        ..RawRecord::new(source)
    }
    .into_record()
    .unwrap()
}

fn atom_feed(id: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/abs/{id}</id>
    <published>2024-06-01T00:00:00Z</published>
    <title>Tool Use in Language Agents</title>
    <summary>We study how language agents call external tools during evaluation.</summary>
    <author><name>Ada Lovelace</name></author>
    <link title="pdf" href="http://arxiv.org/pdf/{id}" rel="related" type="application/pdf"/>
  </entry>
</feed>"#
    )
}

// =============================================================================
// Per-source routines
// =============================================================================

#[tokio::test]
async fn test_arxiv_read_is_cached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/query"))
        .and(query_param("id_list", "2406.01234v2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(atom_feed("2406.01234v2")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let reader = reader(&mock_server);
    let paper = record(SourceId::Arxiv, "Tool Use", "https://arxiv.org/abs/2406.01234v2");

    let first = reader.read(&paper).await;
    let second = reader.read(&paper).await;

    assert!(first.success);
    assert_eq!(first, second);
    assert_eq!(first.content.title, "Tool Use in Language Agents");
    assert_eq!(
        first.content.open_access_pdf.as_deref(),
        Some("https://arxiv.org/pdf/2406.01234v2")
    );
    let full_text = first.content.full_text.as_deref().unwrap();
    assert!(full_text.contains("external tools"));

    let stats = reader.cache_stats();
    assert_eq!(stats.size, 1);
    assert_eq!(stats.keys, vec!["arxiv:https://arxiv.org/abs/2406.01234v2".to_string()]);
}

#[tokio::test]
async fn test_semantic_scholar_read_collects_references() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/graph/v1/paper/{S2_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "paperId": S2_ID,
            "title": "Attention Is All You Need",
            "abstract": "The dominant sequence transduction models are based on recurrent networks.",
            "year": 2017,
            "citationCount": 100000,
            "authors": [{"authorId": "1", "name": "Ashish Vaswani"}],
            "openAccessPdf": {"url": "https://example.org/attention.pdf"},
            "references": [
                {"paperId": "r1", "title": "Sequence to Sequence Learning"},
                {"paperId": "r2", "title": null},
                {"paperId": "r3", "title": "Neural Machine Translation"}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let reader = reader(&mock_server);
    let paper = record(
        SourceId::SemanticScholar,
        "Attention",
        &format!("https://www.semanticscholar.org/paper/Attention/{S2_ID}"),
    );
    let content = reader.read(&paper).await;

    assert!(content.success);
    assert_eq!(content.content.citation_count, 100_000);
    assert_eq!(
        content.content.references,
        Some(vec![
            "Sequence to Sequence Learning".to_string(),
            "Neural Machine Translation".to_string(),
        ])
    );
    assert_eq!(content.content.authors[0].name, "Ashish Vaswani");
    assert!(content.is_usable());
}

#[tokio::test]
async fn test_generic_page_read_uses_meta_tags() {
    let mock_server = MockServer::start().await;

    let page = r#"<html><head>
      <meta name="citation_title" content="Landing Page Paper">
      <meta name="citation_author" content="Alan Turing">
      <meta name="citation_publication_date" content="2021/05/01">
      <meta name="citation_abstract" content="Machines that think, revisited.">
    </head><body><article><p>Full text of the paper body.</p></article></body></html>"#;

    Mock::given(method("GET"))
        .and(path("/landing"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .mount(&mock_server)
        .await;

    let reader = reader(&mock_server);
    let paper = record(SourceId::Generic, "Landing", &format!("{}/landing", mock_server.uri()));
    let content = reader.read(&paper).await;

    assert!(content.success);
    assert_eq!(content.source, SourceId::Generic);
    assert_eq!(content.content.title, "Landing Page Paper");
    assert_eq!(content.content.year, Some(2021));
    assert_eq!(content.content.r#abstract, "Machines that think, revisited.");
}

// =============================================================================
// Failures are values
// =============================================================================

#[tokio::test]
async fn test_failed_read_is_a_value_and_not_cached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    let reader = reader(&mock_server);
    let paper = record(SourceId::Scholar, "Broken", &format!("{}/broken", mock_server.uri()));

    let first = reader.read(&paper).await;
    assert!(!first.success);
    assert!(!first.is_usable());
    assert_eq!(first.error.as_ref().unwrap().kind, ErrorKind::SourceUnavailable);

    let second = reader.read(&paper).await;
    assert!(!second.success);
    assert_eq!(reader.cache_stats().size, 0);
}

#[tokio::test]
async fn test_record_without_url_fails_without_network() {
    let mock_server = MockServer::start().await;
    let reader = reader(&mock_server);

    let paper = RawRecord {
        title: Some("No Link".to_string()),
        ..RawRecord::new(SourceId::Scholar)
    }
    .into_record()
    .unwrap();
    let content = reader.read(&paper).await;

    assert!(!content.success);
    assert_eq!(content.error.unwrap().kind, ErrorKind::ParseFailure);
}

#[tokio::test]
async fn test_cache_evicts_oldest_and_clears() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head>
                <meta name="citation_title" content="Page">
                <meta name="citation_abstract" content="Text.">
            </head></html>"#,
        ))
        .mount(&mock_server)
        .await;

    let mut config = Config::for_testing(&mock_server.uri());
    config.content_cache_size = 2;
    let reader = ContentReader::new(HttpClient::new(&config).unwrap(), &config);

    for name in ["a", "b", "c"] {
        let paper = record(SourceId::Generic, name, &format!("{}/{name}", mock_server.uri()));
        assert!(reader.read(&paper).await.success);
    }

    let stats = reader.cache_stats();
    assert_eq!(stats.size, 2);
    assert_eq!(stats.capacity, 2);
    assert!(stats.keys[0].ends_with("/b"));
    assert!(stats.keys[1].ends_with("/c"));

    reader.clear_cache();
    assert_eq!(reader.cache_stats().size, 0);
}
