//! Extraction of reasoning and recommendations from generated text
//!
//! Participants are prompted to answer with a `Reasoning:` section and a
//! `Recommendations:` list. Responses that ignore the layout still parse:
//! the first paragraph becomes the reasoning and any bullet lines become
//! recommendations.

use std::sync::LazyLock;

use regex::Regex;

static SECTION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:#+\s*|\*\*)?(reasoning|recommendations?|analysis|decision)\s*(?:\*\*)?\s*:\s*(?:\*\*)?\s*(.*)$")
        .expect("SECTION_HEADER regex should compile")
});

static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+(.+?)\s*$").expect("LIST_ITEM regex should compile")
});

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[\s*confidence\s*:[^\]]*\]").expect("MARKER regex should compile")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Reasoning,
    Recommendations,
    Other,
}

/// Structured view of one generated response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedResponse {
    pub reasoning: String,
    pub recommendations: Vec<String>,
}

/// Parse a generated response
pub fn parse_response(text: &str) -> ParsedResponse {
    let text = MARKER.replace_all(text, "");

    let mut section = Section::Preamble;
    let mut reasoning_lines: Vec<&str> = Vec::new();
    let mut preamble_lines: Vec<&str> = Vec::new();
    let mut recommendations = Vec::new();
    let mut loose_items = Vec::new();
    let mut saw_reasoning = false;
    let mut saw_recommendations = false;

    for line in text.lines() {
        if let Some(caps) = SECTION_HEADER.captures(line) {
            let name = caps[1].to_lowercase();
            let rest = caps.get(2).map_or("", |m| m.as_str()).trim();
            section = if name == "reasoning" {
                saw_reasoning = true;
                Section::Reasoning
            } else if name.starts_with("recommendation") {
                saw_recommendations = true;
                Section::Recommendations
            } else {
                Section::Other
            };
            match section {
                Section::Reasoning if !rest.is_empty() => reasoning_lines.push(rest),
                Section::Recommendations if !rest.is_empty() => recommendations.push(rest.to_string()),
                _ => {}
            }
            continue;
        }

        let item = LIST_ITEM.captures(line).map(|c| c[1].to_string());
        match section {
            Section::Reasoning => reasoning_lines.push(line.trim()),
            Section::Recommendations => {
                if let Some(item) = item {
                    recommendations.push(item);
                }
            }
            Section::Preamble => {
                if let Some(item) = item {
                    loose_items.push(item);
                }
                preamble_lines.push(line.trim());
            }
            Section::Other => {
                if let Some(item) = item {
                    loose_items.push(item);
                }
            }
        }
    }

    let reasoning = if saw_reasoning {
        join_paragraph(&reasoning_lines)
    } else {
        let first_paragraph: Vec<&str> = preamble_lines
            .iter()
            .copied()
            .skip_while(|l| l.is_empty())
            .take_while(|l| !l.is_empty())
            .collect();
        join_paragraph(&first_paragraph)
    };

    ParsedResponse {
        reasoning,
        recommendations: if saw_recommendations {
            recommendations
        } else {
            loose_items
        },
    }
}

fn join_paragraph(lines: &[&str]) -> String {
    lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
