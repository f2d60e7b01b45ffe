//! Summary payload parsing.
//!
//! The server stores each summary as a JSON-encoded string shaped like
//! `{"parts":[{"text":"First point. **Key** finding. Last point"}]}`. The text is split
//! into sentence lines; `**...**` runs are surfaced as emphasis spans for the renderer.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::warn;

pub const UNAVAILABLE_MESSAGE: &str = "Summary is not available";

static EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("Invalid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryContent {
    Parsed(Vec<String>),
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Plain(String),
    Emphasis(String),
}

/// Parse a summary payload, falling back to [`SummaryContent::Unavailable`] on malformed JSON.
///
/// Any other JSON value without a `parts[0].text` string parses to no lines, except `null`.
pub fn parse_summary(raw: &str) -> SummaryContent {
    let payload: Value = match serde_json::from_str(raw) {
        Ok(Value::Null) => {
            warn!("Summary payload is null");
            return SummaryContent::Unavailable;
        }
        Ok(payload) => payload,
        Err(e) => {
            warn!("Summary parse error: {}", e);
            return SummaryContent::Unavailable;
        }
    };

    let text = match payload
        .get("parts")
        .and_then(|parts| parts.get(0))
        .and_then(|part| part.get("text"))
        .and_then(Value::as_str)
    {
        Some(text) => text,
        None => return SummaryContent::Parsed(Vec::new()),
    };

    let pieces: Vec<&str> = text.split(". ").collect();
    let last = pieces.len() - 1;
    let lines = pieces
        .into_iter()
        .enumerate()
        .map(|(idx, line)| {
            if idx == last {
                line.to_string()
            } else {
                format!("{}.", line)
            }
        })
        .collect();

    SummaryContent::Parsed(lines)
}

/// Split a line into plain and emphasised runs.
pub fn emphasis_spans(line: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut cursor = 0;

    for caps in EMPHASIS.captures_iter(line) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > cursor {
            spans.push(Span::Plain(line[cursor..whole.start()].to_string()));
        }
        spans.push(Span::Emphasis(inner.as_str().to_string()));
        cursor = whole.end();
    }

    if cursor < line.len() {
        spans.push(Span::Plain(line[cursor..].to_string()));
    }
    spans
}

impl SummaryContent {
    pub fn lines(&self) -> &[String] {
        match self {
            SummaryContent::Parsed(lines) => lines,
            SummaryContent::Unavailable => &[],
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, SummaryContent::Parsed(_))
    }
}
