//! Structured-report parsing for the expert system's responses.
//!
//! The remote model is instructed to emit a fixed five-section markdown
//! report, optionally preceded by a bracketed visual block carrying a
//! dimensional table and/or an SVG sketch. These modules turn that raw
//! text into renderable records, degrading gracefully whenever the model
//! strays from the format.

pub mod markup;
pub mod sections;
pub mod visual;

pub use markup::{bold_runs, TextRun};
pub use sections::{
    split_sections, visible_sections, FilterKey, FilterSet, Section, SectionVariant,
};
pub use visual::{extract_visual, ParsedResponse, VisualData};
