//! Pure text helpers: cleaning, tokenization, similarity and record quality.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use chrono::{Datelike, Utc};
use regex::Regex;

use crate::models::{Author, PaperRecord};

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static regex is valid"));

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("static regex is valid"));

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}").expect("static regex is valid"));

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "this",
    "that", "these", "those", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "do", "does", "did", "will", "would", "could", "should", "can", "may", "might", "must",
    "shall", "from", "as", "we", "you", "they", "it",
];

/// Sources treated as reliable by [`quality_score`].
const RELIABLE_SOURCES: &[&str] = &["arxiv", "ieee", "acm", "springer", "elsevier"];

/// Default similarity at which two records are considered duplicates.
pub const DUPLICATE_THRESHOLD: f64 = 0.8;

/// Collapse every whitespace run to one space and trim.
#[must_use]
pub fn clean_text(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Lowercase, strip punctuation and keep tokens longer than two characters.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    NON_WORD
        .replace_all(&lower, " ")
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity of the token sets of two texts.
#[must_use]
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let left: HashSet<String> = tokenize(a).into_iter().collect();
    let right: HashSet<String> = tokenize(b).into_iter().collect();
    jaccard(&left, &right)
}

/// Jaccard similarity of lowercased author names.
#[must_use]
pub fn author_similarity(a: &[Author], b: &[Author]) -> f64 {
    let left: HashSet<String> = a.iter().map(|x| x.name.to_lowercase()).collect();
    let right: HashSet<String> = b.iter().map(|x| x.name.to_lowercase()).collect();
    jaccard(&left, &right)
}

fn jaccard(left: &HashSet<String>, right: &HashSet<String>) -> f64 {
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let intersection = left.intersection(right).count();
    let union = left.union(right).count();
    intersection as f64 / union as f64
}

/// Weighted similarity: 0.4 title, 0.4 abstract, 0.2 authors.
#[must_use]
pub fn paper_similarity(a: &PaperRecord, b: &PaperRecord) -> f64 {
    text_similarity(&a.title, &b.title) * 0.4
        + text_similarity(&a.r#abstract, &b.r#abstract) * 0.4
        + author_similarity(&a.authors, &b.authors) * 0.2
}

/// A probable duplicate of a candidate record.
#[derive(Debug, Clone, PartialEq)]
pub struct Duplicate<'a> {
    /// Matching existing record.
    pub paper: &'a PaperRecord,
    /// Position in the existing list.
    pub index: usize,
    /// Similarity score.
    pub similarity: f64,
}

/// Existing records at least `threshold` similar to `candidate`, most similar first.
#[must_use]
pub fn find_duplicates<'a>(
    candidate: &PaperRecord,
    existing: &'a [PaperRecord],
    threshold: f64,
) -> Vec<Duplicate<'a>> {
    let mut found: Vec<Duplicate<'a>> = existing
        .iter()
        .enumerate()
        .filter_map(|(index, paper)| {
            let similarity = paper_similarity(candidate, paper);
            (similarity >= threshold).then_some(Duplicate {
                paper,
                index,
                similarity,
            })
        })
        .collect();
    found.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    found
}

/// First four-digit run in a date-like string.
#[must_use]
pub fn extract_year(input: &str) -> Option<i32> {
    YEAR.find(input).and_then(|m| m.as_str().parse().ok())
}

/// Most frequent non-stop-words longer than three characters.
#[must_use]
pub fn extract_keywords(text: &str, max_keywords: usize) -> Vec<String> {
    let tokens = tokenize(text);
    let mut order: Vec<&str> = Vec::new();
    let mut freq: HashMap<&str, usize> = HashMap::new();
    for token in &tokens {
        let counter = freq.entry(token.as_str()).or_insert_with(|| {
            order.push(token.as_str());
            0
        });
        *counter += 1;
    }

    let mut candidates: Vec<&str> = order
        .into_iter()
        .filter(|w| w.chars().count() > 3 && !STOP_WORDS.contains(w))
        .collect();
    // Stable sort keeps first-seen order among equal frequencies.
    candidates.sort_by(|a, b| freq[b].cmp(&freq[a]));
    candidates.into_iter().take(max_keywords).map(str::to_string).collect()
}

/// Shorten an abstract at sentence boundaries.
///
/// Falls back to a hard cut with an ellipsis when the first sentence alone
/// is too long.
#[must_use]
pub fn generate_summary(r#abstract: &str, max_len: usize) -> String {
    if r#abstract.is_empty() {
        return "No abstract available".to_string();
    }
    if r#abstract.chars().count() <= max_len {
        return r#abstract.to_string();
    }

    let mut summary = String::new();
    for sentence in r#abstract.split(['.', '!', '?']).filter(|s| !s.trim().is_empty()) {
        let sentence = sentence.trim();
        if summary.chars().count() + sentence.chars().count() + 1 > max_len {
            break;
        }
        if !summary.is_empty() {
            summary.push(' ');
        }
        summary.push_str(sentence);
        summary.push('.');
    }

    if summary.is_empty() {
        let cut: String = r#abstract.chars().take(max_len).collect();
        format!("{cut}...")
    } else {
        summary
    }
}

/// Human-friendly citation count (`999`, `1.2K`, `3.4M`).
#[must_use]
pub fn format_citation_count(count: u64) -> String {
    match count {
        0..1_000 => count.to_string(),
        1_000..1_000_000 => format!("{:.1}K", count as f64 / 1_000.0),
        _ => format!("{:.1}M", count as f64 / 1_000_000.0),
    }
}

/// Record completeness score from 0 to 100.
#[must_use]
pub fn quality_score(paper: &PaperRecord) -> u8 {
    let mut score = 0.0;
    if paper.title.chars().count() > 10 {
        score += 20.0;
    }
    if paper.r#abstract.chars().count() > 100 {
        score += 20.0;
    }
    if !paper.authors.is_empty() {
        score += 15.0;
    }
    if paper.year.is_some_and(|y| y > 2000) {
        score += 10.0;
    }
    if paper.citation_count > 0 {
        score += (paper.citation_count as f64 / 10.0).min(15.0);
    }
    if RELIABLE_SOURCES.iter().any(|s| paper.source.as_str().contains(s)) {
        score += 10.0;
    }
    if paper.doi.is_some() {
        score += 10.0;
    }
    score.round().min(100.0) as u8
}

/// Outcome of [`validate_paper`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    /// Missing required fields.
    pub errors: Vec<String>,
    /// Suspicious but tolerated values.
    pub warnings: Vec<String>,
}

impl Validation {
    /// No errors (warnings allowed).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check a record for missing fields and quality issues.
#[must_use]
pub fn validate_paper(paper: &PaperRecord) -> Validation {
    let mut result = Validation::default();

    if paper.title.trim().is_empty() {
        result.errors.push("title is empty".to_string());
    }
    if paper.authors.is_empty() {
        result.errors.push("no authors".to_string());
    }
    if paper.r#abstract.trim().is_empty() {
        result.warnings.push("missing abstract".to_string());
    }
    if paper.url.is_empty() {
        result.warnings.push("missing url".to_string());
    }
    if !paper.title.is_empty() && paper.title.chars().count() < 10 {
        result.warnings.push("title is suspiciously short".to_string());
    }
    if !paper.r#abstract.is_empty() && paper.r#abstract.chars().count() < 50 {
        result.warnings.push("abstract is suspiciously short".to_string());
    }
    if let Some(year) = paper.year {
        let max_year = Utc::now().year() + 1;
        if !(1900..=max_year).contains(&year) {
            result.warnings.push(format!("publication year {year} outside 1900..={max_year}"));
        }
    }

    result
}
