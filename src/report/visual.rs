//! Extraction of the bracketed visual/text blocks from extended responses.
//!
//! Responses may bracket a visual block (dimensional table, SVG sketch)
//! and a text-analysis block between literal sentinel tokens. Absence of
//! any expected marker degrades to "no visual data, full text as
//! analysis" — never an error.

use crate::llm::prompts::markers;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Side-panel payload extracted from a visual block. Replaced wholesale
/// whenever a response carries the visual sentinels; sticky otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualData {
    pub svg: Option<String>,
    pub table: Option<String>,
}

/// A response split into its visual payload and display text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    pub visual: Option<VisualData>,
    pub text: String,
}

/// Header row plus at least one following pipe row
static TABLE_STRICT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\|.*\|[ \t]*$(?:\n^\|.*\|[ \t]*$)+").unwrap());

/// Fallback: a single line starting and ending with a pipe. Confined to
/// one line so prose between stray pipe fragments is not swallowed.
static TABLE_LAZY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\|[^\n]*\|").unwrap());

/// Fenced code block tagged as SVG markup
static SVG_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```svg\s*(.*?)```").unwrap());

/// Residual bracketed sentinel-shaped tokens left behind by a confused model
static STRAY_SENTINEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\[\[[A-Z_]*\]\]\]").unwrap());

/// Byte span of the visual block including both sentinels, plus the inner
/// content span, when both sentinels are present in order.
fn visual_span(input: &str) -> Option<(std::ops::Range<usize>, std::ops::Range<usize>)> {
    let start = input.find(markers::VISUAL_PANEL_START)?;
    let inner_start = start + markers::VISUAL_PANEL_START.len();
    let end_rel = input[inner_start..].find(markers::VISUAL_PANEL_END)?;
    let inner_end = inner_start + end_rel;
    Some((
        start..inner_end + markers::VISUAL_PANEL_END.len(),
        inner_start..inner_end,
    ))
}

fn extract_svg(block: &str) -> Option<String> {
    let captured = SVG_FENCE.captures(block)?.get(1)?.as_str().trim();
    if captured.contains("<svg") {
        Some(captured.to_string())
    } else {
        None
    }
}

fn extract_table(block: &str) -> Option<String> {
    TABLE_STRICT
        .find(block)
        .or_else(|| TABLE_LAZY.find(block))
        .map(|m| m.as_str().trim().to_string())
}

/// Split a raw response into visual payload and cleaned display text.
///
/// The cleaned text is, in order of preference: the substring between the
/// text-analysis sentinels (to end of input if the closer is missing),
/// the input minus the visual-block span, or the input unchanged.
pub fn extract_visual(input: &str) -> ParsedResponse {
    let span = visual_span(input);

    let visual = span.as_ref().map(|(_, inner)| {
        let block = &input[inner.clone()];
        VisualData {
            svg: extract_svg(block),
            table: extract_table(block),
        }
    });

    let cleaned = if let Some(text_start) = input.find(markers::TEXT_ANALYSIS_START) {
        let after = &input[text_start + markers::TEXT_ANALYSIS_START.len()..];
        match after.find(markers::TEXT_ANALYSIS_END) {
            Some(end) => &after[..end],
            None => after,
        }
        .to_string()
    } else if let Some((full, _)) = span {
        let mut without = String::with_capacity(input.len() - full.len());
        without.push_str(&input[..full.start]);
        without.push_str(&input[full.end..]);
        without
    } else {
        input.to_string()
    };

    let text = STRAY_SENTINEL.replace_all(&cleaned, "").trim().to_string();

    ParsedResponse { visual, text }
}
