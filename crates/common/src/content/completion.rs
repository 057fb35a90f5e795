//! Parser for labelled article completions
//!
//! The model is asked to answer with a fixed template:
//!
//! ```text
//! TITOLO: ...
//! ESTRATTO: ...
//! SLUG: ...
//! CONTENUTO_HTML:
//! <p>...</p>
//! ```
//!
//! Parsing is a token-driven state machine. Every all-caps `LABEL:` token,
//! wherever it appears, closes the section being captured; a known label then
//! opens its own section, an unknown one leaves the parser idle until the next
//! known label. `CONTENUTO_HTML` is terminal: everything after its colon up to
//! the end of the completion is taken verbatim. The first occurrence of a
//! label wins. Model output that strays from the template is parsed on a
//! best-effort basis.

use crate::content::slug::slugify;
use crate::errors::{AppError, Result};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// All-caps label token, tolerating markdown bold/heading markers around it
const LABEL_PATTERN: &str = r"[*#]*[ \t]*\b([A-Z][A-Z0-9_]*)[ \t]*:\**";

fn label_regex() -> &'static Regex {
    static LABEL: OnceLock<Regex> = OnceLock::new();
    LABEL.get_or_init(|| Regex::new(LABEL_PATTERN).expect("label pattern is a valid regex"))
}

/// Fields extracted from a completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCompletion {
    pub title: String,
    pub excerpt: String,
    pub slug: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Title,
    Excerpt,
    Slug,
    ContentHtml,
}

impl Section {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "TITOLO" | "TITLE" => Some(Section::Title),
            "ESTRATTO" | "EXCERPT" => Some(Section::Excerpt),
            "SLUG" => Some(Section::Slug),
            "CONTENUTO_HTML" | "CONTENT_HTML" => Some(Section::ContentHtml),
            _ => None,
        }
    }

    fn index(self) -> usize {
        match self {
            Section::Title => 0,
            Section::Excerpt => 1,
            Section::Slug => 2,
            Section::ContentHtml => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Not inside any known section
    Idle,
    /// Capturing text into a non-final section, starting at the byte offset
    Capturing(Section, usize),
}

/// Extract title, excerpt, slug and HTML content from a labelled completion.
///
/// Fails with `CompletionParse` when the title or the HTML content is empty.
/// A blank or missing slug is derived from the title.
pub fn parse_completion(text: &str) -> Result<ParsedCompletion> {
    let mut sections: [Option<String>; 4] = [None, None, None, None];
    let mut state = State::Idle;

    for caps in label_regex().captures_iter(text) {
        let (Some(token), Some(label)) = (caps.get(0), caps.get(1)) else {
            continue;
        };

        if let State::Capturing(section, from) = state {
            sections[section.index()] = Some(text[from..token.start()].to_string());
        }

        state = match Section::from_label(label.as_str()) {
            Some(Section::ContentHtml) if sections[Section::ContentHtml.index()].is_none() => {
                sections[Section::ContentHtml.index()] = Some(text[token.end()..].to_string());
                State::Idle
            }
            Some(section) if sections[section.index()].is_none() => {
                State::Capturing(section, token.end())
            }
            _ => State::Idle,
        };

        if sections[Section::ContentHtml.index()].is_some() {
            break;
        }
    }

    if let State::Capturing(section, from) = state {
        sections[section.index()] = Some(text[from..].to_string());
    }

    let [title, excerpt, slug, content] =
        sections.map(|s| s.map(|v| v.trim().to_string()).unwrap_or_default());

    let mut missing = Vec::new();
    if title.is_empty() {
        missing.push("title");
    }
    if content.is_empty() {
        missing.push("content_html");
    }
    if !missing.is_empty() {
        return Err(AppError::CompletionParse {
            missing: missing.join(", "),
        });
    }

    let slug = match slugify(&slug) {
        s if s.is_empty() => slugify(&title),
        s => s,
    };

    Ok(ParsedCompletion {
        title,
        excerpt,
        slug,
        content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_with_empty_slug() {
        let parsed =
            parse_completion("TITOLO: Foo\nESTRATTO: Bar\nSLUG: \nCONTENUTO_HTML:\n<p>Baz</p>")
                .unwrap();
        assert_eq!(
            parsed,
            ParsedCompletion {
                title: "Foo".to_string(),
                excerpt: "Bar".to_string(),
                slug: "foo".to_string(),
                content: "<p>Baz</p>".to_string(),
            }
        );
    }

    #[test]
    fn test_given_slug_is_kept() {
        let parsed = parse_completion(
            "TITOLO: Il valore del Lean\nESTRATTO: Breve\nSLUG: valore-lean\nCONTENUTO_HTML: <h2>Uno</h2>",
        )
        .unwrap();
        assert_eq!(parsed.slug, "valore-lean");
        assert_eq!(parsed.content, "<h2>Uno</h2>");
    }

    #[test]
    fn test_multiline_sections() {
        let text = "TITOLO: Titolo\nESTRATTO: prima riga\nseconda riga\nSLUG: s\nCONTENUTO_HTML:\n<p>a</p>\n<p>b</p>\n";
        let parsed = parse_completion(text).unwrap();
        assert_eq!(parsed.excerpt, "prima riga\nseconda riga");
        assert_eq!(parsed.content, "<p>a</p>\n<p>b</p>");
    }

    #[test]
    fn test_final_section_keeps_label_like_lines() {
        let text = "TITOLO: T\nCONTENUTO_HTML:\n<p>intro</p>\nNOTA: resta nel contenuto\nTITOLO: anche questo\n";
        let parsed = parse_completion(text).unwrap();
        assert_eq!(parsed.title, "T");
        assert_eq!(
            parsed.content,
            "<p>intro</p>\nNOTA: resta nel contenuto\nTITOLO: anche questo"
        );
    }

    #[test]
    fn test_unknown_label_ends_capture() {
        let text = "TITOLO: T\nESTRATTO: E\nCATEGORIA: Strategia\nSLUG:\nCONTENUTO_HTML: <p>x</p>";
        let parsed = parse_completion(text).unwrap();
        assert_eq!(parsed.excerpt, "E");
        assert_eq!(parsed.slug, "t");
    }

    #[test]
    fn test_missing_slug_label_derives_from_title() {
        let text = "TITOLO: Perché la Qualità conta?\nESTRATTO: x\nCONTENUTO_HTML: <p>x</p>";
        let parsed = parse_completion(text).unwrap();
        assert_eq!(parsed.slug, "perche-la-qualita-conta");
    }

    #[test]
    fn test_english_labels_and_markdown_markers() {
        let text = "**TITLE:** Growth\n## EXCERPT: Short\nCONTENT_HTML:\n<p>g</p>";
        let parsed = parse_completion(text).unwrap();
        assert_eq!(parsed.title, "Growth");
        assert_eq!(parsed.excerpt, "Short");
        assert_eq!(parsed.content, "<p>g</p>");
    }

    #[test]
    fn test_preamble_is_ignored() {
        let text = "Ecco l'articolo richiesto:\n\nTITOLO: T\nCONTENUTO_HTML: <p>x</p>";
        let parsed = parse_completion(text).unwrap();
        assert_eq!(parsed.title, "T");
    }

    #[test]
    fn test_first_occurrence_wins() {
        let text = "TITOLO: Primo\nTITOLO: Secondo\nCONTENUTO_HTML: <p>x</p>";
        assert_eq!(parse_completion(text).unwrap().title, "Primo");
    }

    #[test]
    fn test_crlf_line_endings() {
        let text = "TITOLO: Foo\r\nESTRATTO: Bar\r\nSLUG:\r\nCONTENUTO_HTML:\r\n<p>Baz</p>\r\n";
        let parsed = parse_completion(text).unwrap();
        assert_eq!(parsed.title, "Foo");
        assert_eq!(parsed.excerpt, "Bar");
        assert_eq!(parsed.content, "<p>Baz</p>");
    }

    #[test]
    fn test_labels_on_one_line() {
        let parsed = parse_completion(
            "TITOLO: Foo ESTRATTO: Bar SLUG: foo-x CONTENUTO_HTML: <p>Baz</p>",
        )
        .unwrap();
        assert_eq!(
            parsed,
            ParsedCompletion {
                title: "Foo".to_string(),
                excerpt: "Bar".to_string(),
                slug: "foo-x".to_string(),
                content: "<p>Baz</p>".to_string(),
            }
        );
    }

    #[test]
    fn test_single_letter_label_ends_capture() {
        let text = "TITOLO: T\nESTRATTO: Breve Q: domanda\nCONTENUTO_HTML: <p>x</p>";
        assert_eq!(parse_completion(text).unwrap().excerpt, "Breve");
    }

    #[test]
    fn test_mixed_case_words_are_not_labels() {
        let text = "TITOLO: Nota: il Lean funziona\nCONTENUTO_HTML: <p>x</p>";
        assert_eq!(parse_completion(text).unwrap().title, "Nota: il Lean funziona");
    }

    #[test]
    fn test_missing_content_fails() {
        let err = parse_completion("TITOLO: Foo\nESTRATTO: Bar").unwrap_err();
        match err {
            AppError::CompletionParse { missing } => assert_eq!(missing, "content_html"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_title_fails() {
        let err = parse_completion("TITOLO:   \nCONTENUTO_HTML: <p>x</p>").unwrap_err();
        assert!(matches!(err, AppError::CompletionParse { .. }));
    }

    #[test]
    fn test_free_text_fails_on_both_fields() {
        let err = parse_completion("just some prose with no labels").unwrap_err();
        match err {
            AppError::CompletionParse { missing } => assert_eq!(missing, "title, content_html"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
