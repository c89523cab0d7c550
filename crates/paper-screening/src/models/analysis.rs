//! Analysis payloads and persisted results.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::record::PaperRecord;
use crate::error::Failure;

/// A 1-10 rating. Construction always lands inside the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Score(u8);

impl Score {
    /// Lowest rating.
    pub const MIN: u8 = 1;
    /// Highest rating.
    pub const MAX: u8 = 10;
    /// Neutral default used for anything unusable.
    pub const NEUTRAL: Self = Self(5);

    /// Rating value.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Integer rating, or neutral when out of range.
    #[must_use]
    pub fn from_int(value: i64) -> Self {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Self(value as u8)
        } else {
            Self::NEUTRAL
        }
    }

    /// Repair an arbitrary JSON value into a rating.
    ///
    /// Numbers are truncated, strings parsed by their leading integer
    /// (`"8/10"` is 8); everything else is neutral.
    #[must_use]
    pub fn repair(value: &Value) -> Self {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
                .map_or(Self::NEUTRAL, Self::from_int),
            Value::String(s) => leading_int(s).map_or(Self::NEUTRAL, Self::from_int),
            _ => Self::NEUTRAL,
        }
    }
}

fn leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

impl Default for Score {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl TryFrom<i64> for Score {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(format!("score {value} outside 1..=10"))
        }
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> Self {
        score.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a payload was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnalysisOrigin {
    /// Parsed from provider JSON.
    Provider,
    /// Recovered from provider prose by section matching.
    TextHeuristic,
    /// Derived locally without a provider.
    RuleBased,
}

impl AnalysisOrigin {
    /// Confidence floor contributed by the origin, in tenths.
    #[must_use]
    pub const fn base_tenths(self) -> u8 {
        match self {
            Self::Provider => 5,
            Self::TextHeuristic => 3,
            Self::RuleBased => 0,
        }
    }

    /// Confidence floor contributed by the origin.
    #[must_use]
    pub fn base_confidence(self) -> f64 {
        f64::from(self.base_tenths()) / 10.0
    }
}

/// Which prompt schema to request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnalysisVariant {
    /// Eight core fields.
    #[default]
    Standard,
    /// Core fields plus experiment, code and deployment details.
    Extended,
}

/// Additional fields for [`AnalysisVariant::Extended`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedAnalysis {
    /// Reported metrics and numbers.
    #[serde(default)]
    pub experiment_metrics: String,
    /// Whether code or data is released.
    #[serde(default)]
    pub code_openness: String,
    /// Datasets, baselines and setup.
    #[serde(default)]
    pub experiment_details: String,
    /// Demo or project page.
    #[serde(default)]
    pub demo_info: String,
    /// Compute and data requirements.
    #[serde(default)]
    pub resource_requirements: String,
    /// Application scenarios.
    #[serde(default)]
    pub applications: String,
    /// Open directions.
    #[serde(default)]
    pub future_work: String,
}

/// Fixed-shape analysis of one paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisPayload {
    /// Short summary.
    pub summary: String,
    /// Main contributions.
    pub key_points: Vec<String>,
    /// Novelty rating.
    pub innovation_score: Score,
    /// Practical value rating.
    pub practical_score: Score,
    /// Expected impact rating.
    pub impact_score: Score,
    /// Relation to prior work.
    pub related_work: String,
    /// Method description.
    pub methodology: String,
    /// Weaknesses.
    pub limitations: String,
    /// Completeness estimate in `[0, 1]`.
    pub confidence: f64,
    /// Producer of this payload.
    pub origin: AnalysisOrigin,
    /// Extended-variant fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended: Option<ExtendedAnalysis>,
}

/// One analyzed paper as stored in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Result id.
    pub id: Uuid,
    /// Analyzed record.
    pub paper: PaperRecord,
    /// Analysis, absent only when none could be produced.
    pub analysis: Option<AnalysisPayload>,
    /// Degradation or failure note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Failure>,
    /// When the result was produced.
    pub timestamp: DateTime<Utc>,
}

impl AnalysisResult {
    /// Wrap a payload, recording why it was degraded if it was.
    #[must_use]
    pub fn new(paper: PaperRecord, analysis: AnalysisPayload, error: Option<Failure>) -> Self {
        Self {
            id: Uuid::new_v4(),
            paper,
            analysis: Some(analysis),
            error,
            timestamp: Utc::now(),
        }
    }

    /// A result without analysis.
    #[must_use]
    pub fn failed(paper: PaperRecord, error: Failure) -> Self {
        Self {
            id: Uuid::new_v4(),
            paper,
            analysis: None,
            error: Some(error),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_score_repair() {
        assert_eq!(Score::repair(&json!(8)).get(), 8);
        assert_eq!(Score::repair(&json!(7.9)).get(), 7);
        assert_eq!(Score::repair(&json!("9")).get(), 9);
        assert_eq!(Score::repair(&json!("8/10")).get(), 8);
        assert_eq!(Score::repair(&json!(0)), Score::NEUTRAL);
        assert_eq!(Score::repair(&json!(11)), Score::NEUTRAL);
        assert_eq!(Score::repair(&json!(-3)), Score::NEUTRAL);
        assert_eq!(Score::repair(&json!("high")), Score::NEUTRAL);
        assert_eq!(Score::repair(&json!(null)), Score::NEUTRAL);
        assert_eq!(Score::repair(&json!([7])), Score::NEUTRAL);
    }

    #[test]
    fn test_score_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<Score>("7").is_ok());
        assert!(serde_json::from_str::<Score>("0").is_err());
        assert!(serde_json::from_str::<Score>("42").is_err());
        assert_eq!(serde_json::to_string(&Score::NEUTRAL).unwrap(), "5");
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_origin_base_confidence_ordering() {
        let provider = AnalysisOrigin::Provider.base_confidence();
        let heuristic = AnalysisOrigin::TextHeuristic.base_confidence();
        assert!(provider > heuristic);
        assert!(heuristic > AnalysisOrigin::RuleBased.base_confidence());
        assert_eq!(provider, 0.5);
    }
}
