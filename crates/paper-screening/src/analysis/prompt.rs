//! Analysis prompt construction.

use crate::models::{AnalysisVariant, EnrichedContent, PaperRecord};
use crate::text;

/// Longest slice of enriched text embedded in a prompt.
const MAX_CONTENT_CHARS: usize = 8_000;

const NOT_IN_ABSTRACT: &str = "needs the full paper";

/// Build the analysis prompt for `paper`.
///
/// Usable enriched content is embedded and the model is told to rely on
/// it; otherwise the model is told to work from title and abstract and to
/// avoid generic "needs further analysis" answers.
#[must_use]
pub fn build_prompt(
    paper: &PaperRecord,
    content: Option<&EnrichedContent>,
    variant: AnalysisVariant,
) -> String {
    let body = content
        .filter(|c| c.is_usable())
        .map(content_text)
        .filter(|t| !t.is_empty());
    let has_content = body.is_some();

    let mut prompt =
        String::from("Analyze the following academic paper as an expert reviewer.\n\n");

    prompt.push_str("## Important\n");
    if has_content {
        prompt.push_str(
            "You have been given content retrieved from the paper itself. \
             Base a detailed analysis on the complete information.\n\n",
        );
    } else {
        prompt.push_str(
            "Only the title and abstract are available. Give a concrete analysis from them; \
             do not answer with generic statements such as \"needs further analysis\".\n\n",
        );
    }

    prompt.push_str("## Paper\n");
    prompt.push_str(&format!("- Title: {}\n", paper.title));
    prompt.push_str(&format!("- Authors: {}\n", or_unknown(&paper.author_names())));
    prompt.push_str(&format!("- Abstract: {}\n", or_unknown(&paper.r#abstract)));
    prompt.push_str(&format!("- Source: {}\n", paper.source));
    prompt.push_str(&format!(
        "- Year: {}\n",
        paper.year.map_or_else(|| "unknown".to_string(), |y| y.to_string())
    ));
    prompt.push_str(&format!(
        "- Citations: {}\n",
        text::format_citation_count(paper.citation_count)
    ));
    if !paper.keywords.is_empty() {
        let keywords = paper.keywords.iter().cloned().collect::<Vec<_>>();
        prompt.push_str(&format!("- Keywords: {}\n", keywords.join(", ")));
    }
    prompt.push_str(&format!("- URL: {}\n\n", or_unknown(&paper.url)));

    if let Some(body) = &body {
        prompt.push_str("## Paper content\n");
        prompt.push_str(body);
        prompt.push_str("\n\n");
    }

    prompt.push_str("## Required output\nReturn a single JSON object with these fields:\n\n");
    prompt.push_str("1. summary: two or three sentences on the core contribution and novelty\n");
    prompt.push_str("2. keyPoints: array of three to five key technical points\n");
    prompt.push_str("3. innovationScore: integer 1-10, novelty of the work\n");
    prompt.push_str("4. practicalScore: integer 1-10, practical value and applicability\n");
    prompt.push_str("5. impactScore: integer 1-10, expected academic impact\n");
    prompt.push_str(&format!("6. relatedWork: {}\n", related_work_instruction(has_content)));
    prompt.push_str(&format!("7. methodology: {}\n", methodology_instruction(has_content)));
    prompt.push_str(&format!("8. limitations: {}\n", limitations_instruction(has_content)));

    if variant == AnalysisVariant::Extended {
        let extended = [
            (
                "9. experimentMetrics",
                "evaluation metrics, reported results and performance comparisons",
            ),
            (
                "10. codeOpenSource",
                "whether code is released, repository URL and code quality",
            ),
            (
                "11. experimentDetails",
                "experimental design, datasets, evaluation method and baselines",
            ),
            (
                "12. demoInfo",
                "online demo, demo URL and interaction experience",
            ),
            (
                "13. resourceRequirements",
                "GPU, CPU, memory, storage and other resources",
            ),
        ];
        for (field, instruction) in extended {
            prompt.push_str(&format!(
                "{field}: {instruction} (\"{NOT_IN_ABSTRACT}\" if absent)\n"
            ));
        }
        prompt.push_str("14. applications: application scenarios\n");
        prompt.push_str("15. futureWork: open research directions\n");
    }

    prompt.push_str(
        "\n## Scoring\n\
         - Innovation: technical novelty, methodological novelty, theoretical contribution\n\
         - Practicality: real-world value, engineering feasibility, commercial potential\n\
         - Impact: academic influence, citation potential, importance to the field\n",
    );
    prompt.push_str(&format!(
        "\n## Reminders\n\
         - Ground every field in the provided text and extract concrete technical details\n\
         - Never answer \"needs further analysis\" or similar filler\n\
         - Write \"{NOT_IN_ABSTRACT}\" only when the text says nothing on a topic\n\
         - Return valid JSON with every field filled\n"
    ));

    prompt
}

fn content_text(content: &EnrichedContent) -> String {
    let body = &content.content;
    let mut text = String::new();
    if !body.r#abstract.is_empty() {
        text.push_str(&format!("Abstract: {}\n", body.r#abstract));
    }
    let full_text = body
        .full_text
        .as_deref()
        .filter(|t| !t.is_empty() && *t != body.r#abstract);
    if let Some(full) = full_text {
        text.push_str(&format!("Text: {full}\n"));
    }
    if let Some(refs) = body.references.as_ref().filter(|r| !r.is_empty()) {
        text.push_str(&format!("References: {}\n", refs.join("; ")));
    }
    if let Some(pdf) = &body.open_access_pdf {
        text.push_str(&format!("Open access PDF: {pdf}\n"));
    }
    text.chars()
        .take(MAX_CONTENT_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string()
}

fn or_unknown(value: &str) -> &str {
    if value.trim().is_empty() {
        "unknown"
    } else {
        value
    }
}

fn related_work_instruction(has_content: bool) -> &'static str {
    if has_content {
        "from the paper content, how the work relates to and differs from existing research, \
         including compared methods and improvements"
    } else {
        "look for phrases such as \"compared with existing methods\", \"building on\", \
         \"traditional approaches\" or \"improves\"; \
         describe what you find, or say \"not mentioned in the abstract\""
    }
}

fn methodology_instruction(has_content: bool) -> &'static str {
    if has_content {
        "from the paper content, the research method, technical approach, algorithms and \
         experimental design"
    } else {
        "look for named methods, techniques, algorithms, models or frameworks and verbs such as \
         \"adopt\", \"use\" or \"based on\"; \
         describe what you find, or say \"not mentioned in the abstract\""
    }
}

fn limitations_instruction(has_content: bool) -> &'static str {
    if has_content {
        "from the paper content, limitations, open challenges and future directions"
    } else {
        "look for words such as \"limitation\", \"challenge\", \"future work\" or \
         \"further research\"; \
         describe what you find, or say \"not mentioned in the abstract\""
    }
}
