//! Analysis engine: provider call, parse chain and rule-based fallback.
//!
//! [`AnalysisEngine::analyze`] always returns a payload. Each step degrades
//! to the next on failure:
//!
//! 1. cached payload for the paper
//! 2. credential check (invalid routes straight to rules)
//! 3. provider call under a timeout
//! 4. JSON, embedded JSON, labeled-text parsing
//! 5. rule-based analysis
//!
//! Every payload is repaired the same way afterwards: scores land in 1-10,
//! text fields are filled and confidence is recomputed.

mod parse;
mod prompt;
mod rules;

use std::time::Duration;

use serde_json::{Map, Value};
use tracing::debug;

use crate::cache::BoundedCache;
use crate::client::HttpClient;
use crate::config::Config;
use crate::error::{Failure, PipelineError, PipelineResult};
use crate::models::{
    AnalysisOrigin, AnalysisPayload, AnalysisVariant, EnrichedContent, ExtendedAnalysis,
    PaperRecord, Score,
};
use crate::providers::{
    AiProvider, ProviderConfig, ProviderKind, build_provider, validate_credential,
};

pub use parse::{ParsedResponse, balanced_object, parse_response, parse_text_sections};
pub use prompt::build_prompt;
pub use rules::{
    MIN_ABSTRACT_CHARS, VOCABULARY, default_key_points, matched_keywords, rule_based_fields,
};

type Cached = (AnalysisPayload, Option<Failure>);

/// Provider-agnostic analysis with a bounded payload cache.
pub struct AnalysisEngine {
    config: ProviderConfig,
    provider: Option<Box<dyn AiProvider>>,
    cache: BoundedCache<String, Cached>,
    timeout: Duration,
}

impl AnalysisEngine {
    /// Create an engine for the configured provider.
    #[must_use]
    pub fn new(http: HttpClient, config: &Config) -> Self {
        let provider = build_provider(&config.provider, http, config.provider_timeout);
        Self::with_provider(
            config.provider.clone(),
            provider,
            config.analysis_cache_size,
            config.provider_timeout,
        )
    }

    /// Create an engine around an already-built provider.
    #[must_use]
    pub fn with_provider(
        config: ProviderConfig,
        provider: Option<Box<dyn AiProvider>>,
        cache_size: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            config,
            provider,
            cache: BoundedCache::new(cache_size),
            timeout,
        }
    }

    /// Configured provider.
    #[must_use]
    pub fn provider_kind(&self) -> ProviderKind {
        self.config.kind
    }

    /// Analyze one paper.
    pub async fn analyze(
        &self,
        paper: &PaperRecord,
        content: Option<&EnrichedContent>,
        variant: AnalysisVariant,
    ) -> AnalysisPayload {
        self.analyze_detailed(paper, content, variant).await.0
    }

    /// Analyze one paper and report why the result was degraded, if it was.
    ///
    /// The failure is `None` for provider results and for deliberate
    /// rule-based configuration.
    pub async fn analyze_detailed(
        &self,
        paper: &PaperRecord,
        content: Option<&EnrichedContent>,
        variant: AnalysisVariant,
    ) -> (AnalysisPayload, Option<Failure>) {
        let key = cache_key(paper, variant);
        if let Some(cached) = self.cache.get(&key) {
            debug!(paper = %paper.id, "analysis cache hit");
            return cached;
        }

        let outcome = match self.provider_fields(paper, content, variant).await {
            Ok(parsed) => (
                finalize_payload(parsed.fields, paper, parsed.origin, variant),
                None,
            ),
            Err(e) => {
                let failure = (self.config.kind != ProviderKind::RuleBased).then(|| {
                    tracing::warn!(
                        provider = ?self.config.kind,
                        paper = %paper.id,
                        error = %e,
                        "falling back to rule-based analysis"
                    );
                    e.to_failure()
                });
                let fields = rule_based_fields(paper, variant);
                (
                    finalize_payload(fields, paper, AnalysisOrigin::RuleBased, variant),
                    failure,
                )
            }
        };

        self.cache.insert(key, outcome.clone());
        outcome
    }

    /// Drop every cached payload.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Number of cached payloads.
    #[must_use]
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    async fn provider_fields(
        &self,
        paper: &PaperRecord,
        content: Option<&EnrichedContent>,
        variant: AnalysisVariant,
    ) -> PipelineResult<ParsedResponse> {
        validate_credential(&self.config)?;
        let provider = self.provider.as_ref().ok_or_else(|| {
            PipelineError::ProviderAuthInvalid(format!(
                "{} has no network client",
                self.config.kind
            ))
        })?;

        let prompt = build_prompt(paper, content, variant);
        debug!(
            provider = ?provider.kind(),
            model = %self.config.model,
            chars = prompt.len(),
            "calling provider"
        );

        let raw = tokio::time::timeout(self.timeout, provider.call(&prompt, &self.config.model))
            .await
            .map_err(|_| {
                PipelineError::ProviderCallFailure(format!(
                    "provider call timed out after {:?}",
                    self.timeout
                ))
            })??;

        parse_response(&raw)
    }
}

impl std::fmt::Debug for AnalysisEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisEngine")
            .field("provider", &self.config)
            .field("cache_size", &self.cache_size())
            .finish()
    }
}

/// Cache key for a paper: a digest of title, authors and source.
#[must_use]
pub fn cache_key(paper: &PaperRecord, variant: AnalysisVariant) -> String {
    use md5::{Digest, Md5};

    let mut hasher = Md5::new();
    hasher.update(paper.title.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(paper.author_names().as_bytes());
    hasher.update(b"\x1f");
    hasher.update(paper.source.as_str().as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    match variant {
        AnalysisVariant::Standard => digest,
        AnalysisVariant::Extended => format!("{digest}:extended"),
    }
}

/// Repair loosely-typed fields into a complete payload.
#[must_use]
pub fn finalize_payload(
    fields: Map<String, Value>,
    paper: &PaperRecord,
    origin: AnalysisOrigin,
    variant: AnalysisVariant,
) -> AnalysisPayload {
    let text = |key: &str, default: &str| {
        fields
            .get(key)
            .map(flatten_text)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| default.to_string())
    };
    let score = |key: &str| fields.get(key).map_or(Score::NEUTRAL, Score::repair);

    let mut key_points = match fields.get("keyPoints") {
        Some(Value::Array(items)) => items
            .iter()
            .map(flatten_text)
            .filter(|t| !t.is_empty())
            .collect(),
        Some(other) => {
            let single = flatten_text(other);
            if single.is_empty() {
                Vec::new()
            } else {
                vec![single]
            }
        }
        None => Vec::new(),
    };
    if key_points.is_empty() {
        key_points = default_key_points(&paper.r#abstract);
    }

    let extended = (variant == AnalysisVariant::Extended).then(|| ExtendedAnalysis {
        experiment_metrics: text("experimentMetrics", "Not reported"),
        code_openness: text("codeOpenSource", "Not reported"),
        experiment_details: text("experimentDetails", "Not reported"),
        demo_info: text("demoInfo", "Not reported"),
        resource_requirements: text("resourceRequirements", "Not reported"),
        applications: text("applications", "No application information"),
        future_work: text("futureWork", "No future work information"),
    });

    let mut payload = AnalysisPayload {
        summary: text("summary", "No summary available"),
        key_points,
        innovation_score: score("innovationScore"),
        practical_score: score("practicalScore"),
        impact_score: score("impactScore"),
        related_work: text("relatedWork", "No related work information"),
        methodology: text("methodology", "No methodology information"),
        limitations: text("limitations", "No limitations information"),
        confidence: 0.0,
        origin,
        extended,
    };
    payload.confidence = confidence(paper, &payload);
    payload
}

/// Origin floor plus completeness bonuses, capped at 1.
///
/// Counted in whole tenths so the value is always one of 0.0, 0.1, ..., 1.0
/// and survives a JSON round trip unchanged.
#[must_use]
pub fn confidence(paper: &PaperRecord, payload: &AnalysisPayload) -> f64 {
    let mut tenths = payload.origin.base_tenths();
    if paper.r#abstract.chars().count() > 100 {
        tenths += 2;
    }
    if paper.title.chars().count() > 10 {
        tenths += 1;
    }
    if !paper.authors.is_empty() {
        tenths += 1;
    }
    if payload.summary.chars().count() > 50 {
        tenths += 1;
    }
    if !payload.key_points.is_empty() {
        tenths += 1;
    }
    f64::from(tenths.min(10)) / 10.0
}

/// Render any JSON value as display text.
///
/// Objects become `key: value` pairs so nested extended fields stay readable.
fn flatten_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => {
            let parts = items
                .iter()
                .map(flatten_text)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>();
            parts.join("; ")
        }
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| (k, flatten_text(v)))
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join("; "),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::{RawRecord, SourceId};

    fn paper(r#abstract: &str) -> PaperRecord {
        RawRecord {
            title: Some("Benchmarking Autonomous Agents".to_string()),
            r#abstract: Some(r#abstract.to_string()),
            authors: vec!["Ada Lovelace".into()],
            ..RawRecord::new(SourceId::Arxiv)
        }
        .into_record()
        .unwrap()
    }

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_finalize_repairs_scores_and_fills_fields() {
        let fields = as_map(json!({
            "summary": "  ",
            "keyPoints": "single point",
            "innovationScore": 42,
            "practicalScore": "7/10",
            "impactScore": null
        }));
        let payload = finalize_payload(
            fields,
            &paper("short"),
            AnalysisOrigin::Provider,
            AnalysisVariant::Standard,
        );
        assert_eq!(payload.summary, "No summary available");
        assert_eq!(payload.key_points, vec!["single point"]);
        assert_eq!(payload.innovation_score, Score::NEUTRAL);
        assert_eq!(payload.practical_score.get(), 7);
        assert_eq!(payload.impact_score, Score::NEUTRAL);
        assert_eq!(payload.methodology, "No methodology information");
        assert!(payload.extended.is_none());
    }

    #[test]
    fn test_extended_objects_are_flattened() {
        let fields = as_map(json!({
            "codeOpenSource": {"isOpenSource": true, "repositoryUrl": "https://example.org/code"}
        }));
        let payload = finalize_payload(
            fields,
            &paper("x"),
            AnalysisOrigin::Provider,
            AnalysisVariant::Extended,
        );
        let extended = payload.extended.unwrap();
        assert_eq!(
            extended.code_openness,
            "isOpenSource: true; repositoryUrl: https://example.org/code"
        );
        assert_eq!(extended.demo_info, "Not reported");
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_confidence_bonuses() {
        let long_abstract = "a".repeat(150);
        let fields = as_map(json!({"summary": "s".repeat(60), "keyPoints": ["k"]}));
        let payload = finalize_payload(
            fields,
            &paper(&long_abstract),
            AnalysisOrigin::Provider,
            AnalysisVariant::Standard,
        );
        assert_eq!(payload.confidence, 1.0);

        // Every bonus but the abstract one.
        let fields = as_map(json!({"summary": "s".repeat(60), "keyPoints": ["k"]}));
        let payload = finalize_payload(
            fields,
            &paper("short"),
            AnalysisOrigin::Provider,
            AnalysisVariant::Standard,
        );
        assert_eq!(payload.confidence, 0.9);
        let json = serde_json::to_string(&payload.confidence).unwrap();
        assert_eq!(json, "0.9");

        let rules = finalize_payload(
            rule_based_fields(&paper("tiny"), AnalysisVariant::Standard),
            &paper("tiny"),
            AnalysisOrigin::RuleBased,
            AnalysisVariant::Standard,
        );
        assert!(rules.confidence <= 0.5);
    }

    #[test]
    fn test_cache_key_ignores_abstract() {
        let a = paper("one abstract");
        let b = paper("another abstract");
        let standard = cache_key(&a, AnalysisVariant::Standard);
        assert_eq!(standard, cache_key(&b, AnalysisVariant::Standard));
        assert_ne!(standard, cache_key(&a, AnalysisVariant::Extended));
    }

    #[tokio::test]
    async fn test_rule_based_engine_reports_no_failure() {
        let engine = AnalysisEngine::with_provider(
            ProviderConfig::rule_based(),
            None,
            10,
            Duration::from_secs(1),
        );
        let (payload, failure) = engine
            .analyze_detailed(&paper("twenty char abstract"), None, AnalysisVariant::Standard)
            .await;
        assert_eq!(payload.origin, AnalysisOrigin::RuleBased);
        assert!(payload.methodology.contains("Insufficient information"));
        assert!(failure.is_none());
        assert_eq!(engine.cache_size(), 1);
        engine.clear_cache();
        assert_eq!(engine.cache_size(), 0);
    }

    #[tokio::test]
    async fn test_invalid_key_falls_back_with_failure() {
        let config = ProviderConfig::new(ProviderKind::OpenAi, Some("bad".to_string()));
        let engine = AnalysisEngine::with_provider(config, None, 10, Duration::from_secs(1));
        let (payload, failure) = engine
            .analyze_detailed(&paper("abc"), None, AnalysisVariant::Standard)
            .await;
        assert_eq!(payload.origin, AnalysisOrigin::RuleBased);
        assert_eq!(failure.unwrap().kind, crate::error::ErrorKind::ProviderAuthInvalid);
    }
}
