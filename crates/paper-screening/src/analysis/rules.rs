//! Deterministic analysis used when no provider answer is usable.

use serde_json::{Map, Value, json};

use crate::models::{AnalysisVariant, PaperRecord};
use crate::text;

/// Topic vocabulary matched against title and abstract.
pub const VOCABULARY: &[&str] = &[
    "machine learning",
    "deep learning",
    "neural network",
    "artificial intelligence",
    "computer vision",
    "natural language processing",
    "reinforcement learning",
    "data mining",
    "big data",
    "blockchain",
    "cybersecurity",
    "robotics",
    "optimization",
    "algorithm",
    "model",
    "framework",
    "system",
    "classification",
    "regression",
    "clustering",
    "feature extraction",
    "image processing",
    "text analysis",
    "speech recognition",
    "recommendation system",
];

/// Abstracts shorter than this do not support a method assessment.
pub const MIN_ABSTRACT_CHARS: usize = 50;

/// Abstract digest appended to the rule-based summary.
const SUMMARY_DIGEST_CHARS: usize = 200;

const NEEDS_FULL_PAPER: &str = "Needs the full paper.";

/// Vocabulary entries present in `text`, in vocabulary order.
#[must_use]
pub fn matched_keywords(text: &str) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    VOCABULARY.iter().copied().filter(|k| lower.contains(k)).collect()
}

/// Key points implied by the abstract, or generic reading hints.
#[must_use]
pub fn default_key_points(r#abstract: &str) -> Vec<String> {
    let lower = r#abstract.to_lowercase();
    let mut points = Vec::new();

    if lower.contains("machine learning") || lower.contains("deep learning") {
        points.push("Involves machine learning or deep learning techniques");
    }
    if lower.contains("neural network") {
        points.push("Uses neural network methods");
    }
    if lower.contains("algorithm") {
        points.push("Proposes a new algorithm or method");
    }
    if lower.contains("experiment") || lower.contains("evaluation") {
        points.push("Includes experimental validation or performance evaluation");
    }

    if points.is_empty() {
        points = vec![
            "Technical contribution not stated in the available text",
            "Check the experimental design and results",
            "Assess the novelty of the method",
        ];
    }
    points.into_iter().map(str::to_string).collect()
}

/// Rule-based analysis fields for `paper`.
///
/// Scores are neutral. The summary names matched topics and, for a usable
/// abstract, adds its leading sentences. When the abstract is too short to
/// support an assessment, the narrative fields say so.
#[must_use]
pub fn rule_based_fields(paper: &PaperRecord, variant: AnalysisVariant) -> Map<String, Value> {
    let topics = matched_keywords(&format!("{} {}", paper.title, paper.r#abstract));
    let topic_list = topics.iter().take(3).copied().collect::<Vec<_>>().join(", ");
    let thin = paper.r#abstract.chars().count() < MIN_ABSTRACT_CHARS;

    let lead = if topic_list.is_empty() {
        format!("A research paper titled \"{}\".", paper.title)
    } else {
        format!("A research paper on {topic_list}.")
    };
    let summary = if thin {
        lead
    } else {
        let digest = text::generate_summary(&paper.r#abstract, SUMMARY_DIGEST_CHARS);
        format!("{lead} {digest}")
    };

    let (related_work, methodology, limitations) = if thin {
        (
            "Insufficient information: the abstract is too short to relate this work to prior \
             research."
                .to_string(),
            "Insufficient information: the abstract is too short to identify the methodology."
                .to_string(),
            "Insufficient information: the abstract is too short to identify limitations."
                .to_string(),
        )
    } else {
        let methodology = if topic_list.is_empty() {
            "No specific method is named in the abstract.".to_string()
        } else {
            format!("The abstract points to work involving {topic_list}.")
        };
        (
            "Relation to prior work is not stated in the abstract.".to_string(),
            methodology,
            "Limitations are not stated in the abstract.".to_string(),
        )
    };

    let mut fields = Map::new();
    let mut put = |key: &str, value: Value| {
        fields.insert(key.to_string(), value);
    };
    put("summary", Value::String(summary));
    put("keyPoints", json!(default_key_points(&paper.r#abstract)));
    put("innovationScore", json!(5));
    put("practicalScore", json!(5));
    put("impactScore", json!(5));
    put("relatedWork", Value::String(related_work));
    put("methodology", Value::String(methodology));
    put("limitations", Value::String(limitations));

    if variant == AnalysisVariant::Extended {
        for key in [
            "experimentMetrics",
            "codeOpenSource",
            "experimentDetails",
            "demoInfo",
            "resourceRequirements",
            "applications",
            "futureWork",
        ] {
            put(key, Value::String(NEEDS_FULL_PAPER.to_string()));
        }
    }

    fields
}
