//! Provider response parsing: JSON, embedded JSON, then labeled text.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{PipelineError, PipelineResult};
use crate::models::AnalysisOrigin;

static LEADING_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*?[:：]\s*").expect("static regex is valid"));

static FIRST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("static regex is valid"));

/// Fields recovered from a provider response.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    /// Loosely-typed fields, repaired later.
    pub fields: Map<String, Value>,
    /// Which strategy produced the fields.
    pub origin: AnalysisOrigin,
}

/// Parse raw completion text.
///
/// Tries the whole text as a JSON object, then the first balanced `{...}`
/// substring that parses, then the labeled-section heuristic.
pub fn parse_response(raw: &str) -> PipelineResult<ParsedResponse> {
    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(raw.trim()) {
        return Ok(ParsedResponse {
            fields,
            origin: AnalysisOrigin::Provider,
        });
    }
    if let Some(fields) = embedded_object(raw) {
        return Ok(ParsedResponse {
            fields,
            origin: AnalysisOrigin::Provider,
        });
    }
    if let Some(fields) = parse_text_sections(raw) {
        tracing::debug!(fields = fields.len(), "recovered analysis from labeled text");
        return Ok(ParsedResponse {
            fields,
            origin: AnalysisOrigin::TextHeuristic,
        });
    }

    let preview: String = raw.chars().take(80).collect();
    Err(PipelineError::ResponseUnparsable(format!("no JSON or labeled sections in {preview:?}")))
}

fn embedded_object(raw: &str) -> Option<Map<String, Value>> {
    raw.match_indices('{').find_map(|(start, _)| {
        let candidate = balanced_object(&raw[start..])?;
        match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Object(fields)) => Some(fields),
            _ => None,
        }
    })
}

/// The balanced `{...}` prefix of `text`, which must start with `{`.
///
/// Braces inside JSON strings are ignored.
#[must_use]
pub fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Summary,
    KeyPoints,
    RelatedWork,
    Methodology,
    Limitations,
    Applications,
    FutureWork,
}

impl Section {
    const fn key(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::KeyPoints => "keyPoints",
            Self::RelatedWork => "relatedWork",
            Self::Methodology => "methodology",
            Self::Limitations => "limitations",
            Self::Applications => "applications",
            Self::FutureWork => "futureWork",
        }
    }
}

enum Line {
    Open(Section),
    Score(&'static str),
}

fn classify(lower: &str) -> Option<Line> {
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));
    if has(&["summary", "简介"]) {
        Some(Line::Open(Section::Summary))
    } else if has(&["keypoints", "key points", "要点"]) {
        Some(Line::Open(Section::KeyPoints))
    } else if has(&["innovation", "创新性"]) {
        Some(Line::Score("innovationScore"))
    } else if has(&["practical", "实用性"]) {
        Some(Line::Score("practicalScore"))
    } else if has(&["impact", "影响力"]) {
        Some(Line::Score("impactScore"))
    } else if has(&["relatedwork", "related work", "相关研究"]) {
        Some(Line::Open(Section::RelatedWork))
    } else if has(&["methodology", "方法论"]) {
        Some(Line::Open(Section::Methodology))
    } else if has(&["limitations", "局限性"]) {
        Some(Line::Open(Section::Limitations))
    } else if has(&["applications", "应用"]) {
        Some(Line::Open(Section::Applications))
    } else if has(&["futurework", "future work", "未来工作"]) {
        Some(Line::Open(Section::FutureWork))
    } else {
        None
    }
}

/// Recover fields from prose with labeled sections.
///
/// A label line opens a section and its text after the first colon becomes
/// the section value; `-` or `•` bullets under key points become list items.
/// Score labels take the first integer on the line. Returns `None` when no
/// label is recognized.
#[must_use]
pub fn parse_text_sections(text: &str) -> Option<Map<String, Value>> {
    let mut fields = Map::new();
    let mut key_points = Vec::new();
    let mut current = None;
    let mut recognized = false;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let bullet = line.strip_prefix('-').or_else(|| line.strip_prefix('•')).map(str::trim);
        if let Some(item) = bullet {
            if current == Some(Section::KeyPoints) && !item.is_empty() {
                key_points.push(Value::String(item.to_string()));
                continue;
            }
        }

        match classify(&line.to_lowercase()) {
            Some(Line::Open(section)) => {
                recognized = true;
                current = Some(section);
                if section != Section::KeyPoints {
                    let value = LEADING_LABEL.replace(line, "").trim().to_string();
                    fields.insert(section.key().to_string(), Value::String(value));
                }
            }
            Some(Line::Score(key)) => {
                recognized = true;
                let score = FIRST_NUMBER
                    .find(line)
                    .map_or(Value::Null, |m| Value::String(m.as_str().to_string()));
                fields.insert(key.to_string(), score);
            }
            None => {}
        }
    }

    if !recognized {
        return None;
    }
    fields.insert("keyPoints".to_string(), Value::Array(key_points));
    Some(fields)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_direct_json() {
        let parsed = parse_response(r#"{"summary": "S", "innovationScore": 8}"#).unwrap();
        assert_eq!(parsed.origin, AnalysisOrigin::Provider);
        assert_eq!(parsed.fields["innovationScore"], json!(8));
    }

    #[test]
    fn test_json_embedded_in_prose() {
        let raw = "Sure! Here is the analysis:\n```json\n\
                   {\"summary\": \"Uses {braces} inside\", \"keyPoints\": [\"a\"]}\n\
                   ```\nHope it helps {really}.";
        let parsed = parse_response(raw).unwrap();
        assert_eq!(parsed.origin, AnalysisOrigin::Provider);
        assert_eq!(parsed.fields["summary"], json!("Uses {braces} inside"));
    }

    #[test]
    fn test_skips_unparsable_brace_group() {
        let raw = "Note {not json} then {\"summary\": \"ok\"}";
        let parsed = parse_response(raw).unwrap();
        assert_eq!(parsed.fields["summary"], json!("ok"));
    }

    #[test]
    fn test_labeled_text() {
        let raw = "Summary: A new agent benchmark.\n\
                   Key points:\n- Realistic tasks\n• Open leaderboard\n\
                   Innovation score: 8/10\nPractical: 7\nImpact: high\n\
                   Methodology: Simulation study.";
        let parsed = parse_response(raw).unwrap();
        assert_eq!(parsed.origin, AnalysisOrigin::TextHeuristic);
        assert_eq!(parsed.fields["summary"], json!("A new agent benchmark."));
        assert_eq!(
            parsed.fields["keyPoints"],
            json!(["Realistic tasks", "Open leaderboard"])
        );
        assert_eq!(parsed.fields["innovationScore"], json!("8"));
        assert_eq!(parsed.fields["practicalScore"], json!("7"));
        assert_eq!(parsed.fields["impactScore"], Value::Null);
        assert_eq!(parsed.fields["methodology"], json!("Simulation study."));
    }

    #[test]
    fn test_unrecognized_text_is_unparsable() {
        let err = parse_response("I cannot help with that.").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ResponseUnparsable);
    }

    #[test]
    fn test_balanced_object_edges() {
        assert_eq!(balanced_object(r#"{"a": "}"} trailing"#), Some(r#"{"a": "}"}"#));
        assert_eq!(balanced_object(r#"{"a": "\"}"}"#), Some(r#"{"a": "\"}"}"#));
        assert_eq!(balanced_object("{ unclosed"), None);
    }

    #[test]
    fn test_json_array_is_not_an_analysis() {
        assert!(parse_response("[1, 2, 3]").is_err());
    }
}
