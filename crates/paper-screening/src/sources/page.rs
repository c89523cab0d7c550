//! Generic landing-page parser (Highwire `citation_*` meta tags plus fallbacks).

use scraper::{ElementRef, Html, Selector};

use crate::error::{PipelineError, PipelineResult};
use crate::models::{RawAuthor, RawRecord, SourceId};
use crate::text;

/// Longest page text kept as `full_text`.
pub const FULL_TEXT_LIMIT: usize = 5_000;

/// Bibliographic fields scraped from a single HTML page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    /// Page or citation title.
    pub title: String,
    /// Abstract text.
    pub r#abstract: String,
    /// Author names.
    pub authors: Vec<String>,
    /// Publication date as printed.
    pub date: Option<String>,
    /// DOI.
    pub doi: Option<String>,
    /// PDF link.
    pub pdf_url: Option<String>,
    /// Journal or conference.
    pub venue: Option<String>,
    /// Visible body text, truncated.
    pub full_text: String,
}

impl PageMetadata {
    /// Convert into a raw record for `source`.
    #[must_use]
    pub fn into_raw(self, source: SourceId, url: &str) -> RawRecord {
        RawRecord {
            title: Some(self.title),
            r#abstract: Some(self.r#abstract),
            authors: self.authors.iter().map(|a| RawAuthor::from(a.as_str())).collect(),
            published: self.date,
            url: Some(url.to_string()),
            pdf_url: self.pdf_url,
            doi: self.doi,
            venue: self.venue,
            ..RawRecord::new(source)
        }
    }
}

pub(crate) fn parse_selector(input: &str) -> PipelineResult<Selector> {
    Selector::parse(input)
        .map_err(|e| PipelineError::parse(format!("invalid selector {input}: {e}")))
}

pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    text::clean_text(&el.text().collect::<Vec<_>>().join(" "))
}

/// Parse bibliographic metadata from an HTML page.
pub fn parse_landing_page(html: &str) -> PipelineResult<PageMetadata> {
    let meta_selector = parse_selector("meta[name], meta[property]")?;
    let title_selector = parse_selector("title, h1")?;
    let abstract_selector = parse_selector(
        ".abstract, #abstract, [class*='abstract'], section.abstract, blockquote.abstract",
    )?;
    let body_selector = parse_selector("body")?;

    let document = Html::parse_document(html);
    let mut page = PageMetadata::default();
    let mut description = None;

    for meta in document.select(&meta_selector) {
        let element = meta.value();
        let Some(name) = element.attr("name").or_else(|| element.attr("property")) else {
            continue;
        };
        let Some(content) = element
            .attr("content")
            .map(text::clean_text)
            .filter(|c| !c.is_empty())
        else {
            continue;
        };

        match name.to_ascii_lowercase().as_str() {
            "citation_title" | "dc.title" if page.title.is_empty() => page.title = content,
            "citation_author" | "dc.creator" => page.authors.push(content),
            "citation_abstract" | "dc.description" if page.r#abstract.is_empty() => {
                page.r#abstract = content;
            }
            "citation_publication_date" | "citation_date" | "citation_online_date" | "dc.date"
            | "citation_year"
                if page.date.is_none() =>
            {
                page.date = Some(content);
            }
            "citation_doi" if page.doi.is_none() => {
                page.doi = Some(content.trim_start_matches("doi:").to_string());
            }
            "citation_pdf_url" if page.pdf_url.is_none() => page.pdf_url = Some(content),
            "citation_journal_title" | "citation_conference_title" if page.venue.is_none() => {
                page.venue = Some(content);
            }
            "description" | "og:description" if description.is_none() => {
                description = Some(content);
            }
            "og:title" if page.title.is_empty() => page.title = content,
            _ => {}
        }
    }

    if page.title.is_empty() {
        if let Some(el) = document.select(&title_selector).next() {
            page.title = element_text(el);
        }
    }
    if page.r#abstract.is_empty() {
        page.r#abstract = document
            .select(&abstract_selector)
            .map(element_text)
            .find(|t| !t.is_empty())
            .or(description)
            .unwrap_or_default();
    }
    if let Some(body) = document.select(&body_selector).next() {
        page.full_text = element_text(body).chars().take(FULL_TEXT_LIMIT).collect();
    }

    Ok(page)
}
