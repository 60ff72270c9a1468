//! Splits a raw response into the five canonical report sections.

use crate::llm::prompts::markers;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Visual treatment of a section card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionVariant {
    Default,
    Warning,
    Success,
    Info,
    Norm,
}

/// Key a section is filtered under. Sections without a key always render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FilterKey {
    Analise,
    Normas,
    Riscos,
    Recomendacoes,
    Conclusao,
}

impl FilterKey {
    pub const ALL: [FilterKey; 5] = [
        FilterKey::Analise,
        FilterKey::Normas,
        FilterKey::Riscos,
        FilterKey::Recomendacoes,
        FilterKey::Conclusao,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FilterKey::Analise => "Análise",
            FilterKey::Normas => "Normas",
            FilterKey::Riscos => "Riscos",
            FilterKey::Recomendacoes => "Recomendações",
            FilterKey::Conclusao => "Conclusão",
        }
    }
}

/// One renderable card derived from a response. Never stored; produced
/// fresh from the message text on every render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub content: String,
    pub variant: SectionVariant,
    pub filter_key: Option<FilterKey>,
}

impl Section {
    fn unlabeled(content: &str) -> Self {
        Self {
            title: String::new(),
            content: content.to_string(),
            variant: SectionVariant::Default,
            filter_key: None,
        }
    }
}

/// The set of active filter keys. Never allowed to become empty: removing
/// the last remaining key is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSet {
    active: BTreeSet<FilterKey>,
}

impl FilterSet {
    /// All five keys active
    pub fn all() -> Self {
        Self {
            active: FilterKey::ALL.iter().copied().collect(),
        }
    }

    pub fn contains(&self, key: FilterKey) -> bool {
        self.active.contains(&key)
    }

    /// Toggle a key on or off. Returns the resulting activation state of
    /// the key, which is unchanged when the removal would empty the set.
    pub fn toggle(&mut self, key: FilterKey) -> bool {
        if self.active.contains(&key) {
            if self.active.len() > 1 {
                self.active.remove(&key);
            }
        } else {
            self.active.insert(key);
        }
        self.active.contains(&key)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

impl Default for FilterSet {
    fn default() -> Self {
        Self::all()
    }
}

/// Canonical heading table: heading string the model emits, display title,
/// card variant and filter key.
const HEADINGS: [(&str, &str, SectionVariant, FilterKey); 5] = [
    (
        markers::HEADING_NORMATIVE,
        "Interpretação Normativa",
        SectionVariant::Norm,
        FilterKey::Normas,
    ),
    (
        markers::HEADING_ANALYSIS,
        "Avaliação Técnica",
        SectionVariant::Info,
        FilterKey::Analise,
    ),
    (
        markers::HEADING_RISKS,
        "Riscos e Pontos Críticos",
        SectionVariant::Warning,
        FilterKey::Riscos,
    ),
    (
        markers::HEADING_RECOMMENDATIONS,
        "Recomendações Técnicas",
        SectionVariant::Default,
        FilterKey::Recomendacoes,
    ),
    (
        markers::HEADING_CONCLUSION,
        "Conclusão Profissional",
        SectionVariant::Success,
        FilterKey::Conclusao,
    ),
];

/// True when `text[pos..]` starts a numbered section heading: `## <digit>. `
fn is_heading_start(bytes: &[u8], pos: usize) -> bool {
    bytes.len() >= pos + 6
        && &bytes[pos..pos + 3] == b"## "
        && bytes[pos + 3].is_ascii_digit()
        && bytes[pos + 4] == b'.'
        && bytes[pos + 5] == b' '
}

/// Partition `text` at every position immediately preceding a numbered
/// heading. The heading itself stays with its partition.
fn partition_at_headings(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut starts = vec![0usize];
    for pos in 1..bytes.len() {
        if is_heading_start(bytes, pos) {
            starts.push(pos);
        }
    }
    starts.push(bytes.len());

    starts
        .windows(2)
        .map(|w| &text[w[0]..w[1]])
        .filter(|part| !part.trim().is_empty())
        .collect()
}

/// Split a raw response into ordered sections.
///
/// Each partition starting with a canonical heading becomes a labeled
/// section; anything else (preamble, unrecognized headings, appended
/// citation lists) becomes an unlabeled Default section that is never
/// filtered out.
pub fn split_sections(text: &str) -> Vec<Section> {
    partition_at_headings(text)
        .into_iter()
        .map(|part| {
            let trimmed = part.trim();
            for (heading, title, variant, filter_key) in HEADINGS {
                if let Some(rest) = trimmed.strip_prefix(heading) {
                    return Section {
                        title: title.to_string(),
                        content: rest.trim().to_string(),
                        variant,
                        filter_key: Some(filter_key),
                    };
                }
            }
            Section::unlabeled(trimmed)
        })
        .collect()
}

/// Sections that survive the active filter set, in input order.
pub fn visible_sections(text: &str, filters: &FilterSet) -> Vec<Section> {
    split_sections(text)
        .into_iter()
        .filter(|section| match section.filter_key {
            Some(key) => filters.contains(key),
            None => true,
        })
        .collect()
}
