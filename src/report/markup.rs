//! Inline `**bold**` tokenizer for section bodies.

/// A run of text with uniform emphasis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub emphasized: bool,
}

impl TextRun {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            emphasized: false,
        }
    }

    fn emphasized(text: &str) -> Self {
        Self {
            text: text.to_string(),
            emphasized: true,
        }
    }
}

/// Tokenize a section body into alternating plain/emphasized runs.
///
/// Only paired `**...**` markers produce emphasis; an unmatched opener is
/// left in the text verbatim, so malformed model output renders as-is
/// instead of failing.
pub fn bold_runs(text: &str) -> Vec<TextRun> {
    let mut runs = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("**") {
        let after_open = &rest[open + 2..];
        match after_open.find("**") {
            Some(close) => {
                if open > 0 {
                    runs.push(TextRun::plain(&rest[..open]));
                }
                runs.push(TextRun::emphasized(&after_open[..close]));
                rest = &after_open[close + 2..];
            }
            None => break,
        }
    }

    if !rest.is_empty() {
        runs.push(TextRun::plain(rest));
    }

    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text() {
        let runs = bold_runs("sem destaque");
        assert_eq!(runs, vec![TextRun::plain("sem destaque")]);
    }

    #[test]
    fn test_single_bold_span() {
        let runs = bold_runs("tolerância **H7** no furo");
        assert_eq!(
            runs,
            vec![
                TextRun::plain("tolerância "),
                TextRun::emphasized("H7"),
                TextRun::plain(" no furo"),
            ]
        );
    }

    #[test]
    fn test_multiple_spans() {
        let runs = bold_runs("**a** e **b**");
        assert_eq!(runs.len(), 3);
        assert!(runs[0].emphasized);
        assert_eq!(runs[1].text, " e ");
        assert!(runs[2].emphasized);
    }

    #[test]
    fn test_unmatched_marker_is_literal() {
        let runs = bold_runs("aço **1045 sem fechamento");
        assert_eq!(runs, vec![TextRun::plain("aço **1045 sem fechamento")]);
    }

    #[test]
    fn test_leading_and_trailing_bold() {
        let runs = bold_runs("**início** meio **fim**");
        assert_eq!(runs[0], TextRun::emphasized("início"));
        assert_eq!(runs[2], TextRun::emphasized("fim"));
    }

    #[test]
    fn test_empty_bold_span() {
        let runs = bold_runs("x****y");
        assert_eq!(
            runs,
            vec![
                TextRun::plain("x"),
                TextRun::emphasized(""),
                TextRun::plain("y"),
            ]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(bold_runs("").is_empty());
    }
}
