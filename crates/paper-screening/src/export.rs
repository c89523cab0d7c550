//! History export: JSON, CSV and BibTeX.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::models::AnalysisResult;

/// Export output format.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Pretty-printed JSON array of results.
    #[default]
    Json,
    /// One row per result.
    Csv,
    /// One `@article` entry per result.
    Bibtex,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Bibtex => "bibtex",
        })
    }
}

impl FromStr for ExportFormat {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "bibtex" | "bib" => Ok(Self::Bibtex),
            other => Err(PipelineError::parse(format!("unknown export format '{other}'"))),
        }
    }
}

const CSV_HEADER: &str =
    "Title,Authors,Year,Source,Citation Count,URL,DOI,Summary,Innovation,Practical,Impact";

/// Render results in the requested format.
pub fn export_results(results: &[AnalysisResult], format: ExportFormat) -> PipelineResult<String> {
    match format {
        ExportFormat::Json => encode_json(results),
        ExportFormat::Csv => Ok(format_csv(results)),
        ExportFormat::Bibtex => Ok(format_bibtex(results)),
    }
}

/// Pretty JSON. An encoding failure means the stored history is unusable.
fn encode_json<T: Serialize + ?Sized>(value: &T) -> PipelineResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| PipelineError::storage(format!("encode export: {e}")))
}

/// Format results as CSV.
fn format_csv(results: &[AnalysisResult]) -> String {
    let mut output = String::from(CSV_HEADER);
    output.push('\n');

    for result in results {
        let paper = &result.paper;
        let authors = paper
            .authors
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        let year = paper.year.map_or(String::new(), |y| y.to_string());
        let (summary, innovation, practical, impact) = result.analysis.as_ref().map_or_else(
            || (String::new(), String::new(), String::new(), String::new()),
            |a| {
                (
                    a.summary.clone(),
                    a.innovation_score.to_string(),
                    a.practical_score.to_string(),
                    a.impact_score.to_string(),
                )
            },
        );

        let row = [
            csv_escape(&paper.title),
            csv_escape(&authors),
            year,
            paper.source.to_string(),
            paper.citation_count.to_string(),
            csv_escape(&paper.url),
            csv_escape(paper.doi.as_deref().unwrap_or("")),
            csv_escape(&summary),
            innovation,
            practical,
            impact,
        ];
        output.push_str(&row.join(","));
        output.push('\n');
    }

    output
}

/// Format results as BibTeX.
fn format_bibtex(results: &[AnalysisResult]) -> String {
    let mut entries = Vec::with_capacity(results.len());

    for result in results {
        let paper = &result.paper;
        let mut entry = format!("@article{{{},\n", bibtex_key(&paper.id));
        entry.push_str(&format!("  title = {{{}}},\n", escape_bibtex(&paper.title)));
        let authors = paper
            .authors
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(" and ");
        entry.push_str(&format!("  author = {{{}}},\n", escape_bibtex(&authors)));
        if let Some(year) = paper.year {
            entry.push_str(&format!("  year = {{{year}}},\n"));
        }
        entry.push_str(&format!("  journal = {{{}}},\n", paper.source));
        if !paper.url.is_empty() {
            entry.push_str(&format!("  url = {{{}}},\n", paper.url));
        }
        if let Some(doi) = &paper.doi {
            entry.push_str(&format!("  doi = {{{doi}}},\n"));
        }
        entry.push('}');
        entries.push(entry);
    }

    entries.join("\n\n")
}

/// Citation key from a record id: ASCII alphanumerics, `-`, `_`, `:` and `.` survive.
fn bibtex_key(id: &str) -> String {
    let key: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if key.is_empty() {
        "paper".to_string()
    } else {
        key
    }
}

/// Escape a string for BibTeX output.
fn escape_bibtex(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '{' | '}' | '&' | '%' | '$' | '#' | '_' => {
                out.push('\\');
                out.push(c);
            }
            '^' => out.push_str("\\textasciicircum{}"),
            '~' => out.push_str("\\textasciitilde{}"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a string for CSV output.
///
/// Fields starting with a formula trigger are prefixed with `'` so
/// spreadsheets do not evaluate them.
fn csv_escape(s: &str) -> String {
    let guarded = if s.starts_with(['=', '+', '-', '@']) {
        format!("'{s}")
    } else {
        s.to_string()
    };
    if guarded.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", guarded.replace('"', "\"\""))
    } else {
        guarded
    }
}
