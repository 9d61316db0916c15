//! Directive extraction strategies.
//!
//! Each strategy is a pure matcher over a planning response. The extractor
//! tries them in order and the first non-empty match wins.

use regex::Regex;
use std::sync::LazyLock;

static FENCED_BLOCK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(.*?)```").expect("fenced block regex is valid"));

static CONTENT_TYPE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)markdown\r?\n").expect("content type regex is valid"));

/// A single way of pulling a directive out of free-form text.
pub trait DirectiveStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Return the trimmed directive, or `None` when this strategy does not match.
    fn extract(&self, text: &str) -> Option<String>;
}

/// Labeled-section strategy.
///
/// Finds the earliest section marker (e.g. `【プロンプト】`), then the first
/// `markdown` content-type line after it. The directive runs from there to
/// the earliest of: an example-response marker on a new line, the next `###`
/// heading, the next `##` heading, or the end of the text.
pub struct StructuredSection {
    section_markers: Vec<String>,
    end_markers: Vec<String>,
}

impl StructuredSection {
    pub fn new(section_markers: &[String], example_markers: &[String]) -> Self {
        let mut end_markers: Vec<String> = example_markers
            .iter()
            .filter(|m| !m.is_empty())
            .map(|m| format!("\n{}", m))
            .collect();
        end_markers.push("\n\n### ".to_string());
        end_markers.push("\n\n## ".to_string());

        Self {
            section_markers: section_markers
                .iter()
                .filter(|m| !m.is_empty())
                .cloned()
                .collect(),
            end_markers,
        }
    }
}

impl DirectiveStrategy for StructuredSection {
    fn name(&self) -> &'static str {
        "structured-section"
    }

    fn extract(&self, text: &str) -> Option<String> {
        let start = self
            .section_markers
            .iter()
            .filter_map(|marker| text.find(marker.as_str()))
            .min()?;
        let section = &text[start..];

        let content_type = CONTENT_TYPE_REGEX.find(section)?;
        let body = &section[content_type.end()..];

        let end = self
            .end_markers
            .iter()
            .filter_map(|marker| body.find(marker.as_str()))
            .min()
            .unwrap_or(body.len());

        let directive = body[..end].trim();
        if directive.is_empty() {
            None
        } else {
            Some(directive.to_string())
        }
    }
}

/// Fenced code block strategy: the content of the last triple-backtick block.
///
/// A first line made of a single token (`markdown`, `text`, or nothing) is
/// treated as the language tag and dropped.
pub struct FencedBlock;

impl FencedBlock {
    fn block_body(inner: &str) -> &str {
        match inner.split_once('\n') {
            Some((first, rest)) if !first.trim().contains(char::is_whitespace) => rest,
            Some(_) => inner,
            None => inner,
        }
    }
}

impl DirectiveStrategy for FencedBlock {
    fn name(&self) -> &'static str {
        "fenced-block"
    }

    fn extract(&self, text: &str) -> Option<String> {
        let last = FENCED_BLOCK_REGEX
            .captures_iter(text)
            .filter_map(|cap| cap.get(1))
            .last()?;

        let directive = Self::block_body(last.as_str()).trim();
        if directive.is_empty() {
            None
        } else {
            Some(directive.to_string())
        }
    }
}
