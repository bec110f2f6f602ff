//! Classification of untyped external tool output into [`RichContentItem`]s.
//!
//! Text is run through an ordered rule table; the first rule whose predicate
//! holds decides the kind. Binary payloads and resource references are
//! classified by media type and URI scheme alone.

use regex::Regex;
use std::sync::LazyLock;

use super::language::{detect_language, language_from_media_type};
use super::rich_content::{ContentKind, RichContentItem};

/// Text plus its declared media type, as seen by the rules
pub struct TextInput<'a> {
    pub text: &'a str,
    pub media_type: Option<&'a str>,
}

impl TextInput<'_> {
    fn media_essence(&self) -> Option<String> {
        self.media_type.map(|m| {
            m.split(';')
                .next()
                .unwrap_or(m)
                .trim()
                .to_ascii_lowercase()
        })
    }
}

/// One entry of the classification table
pub struct ClassificationRule {
    pub priority: u8,
    pub name: &'static str,
    pub predicate: fn(&TextInput<'_>) -> bool,
    pub kind: ContentKind,
}

/// Evaluated in ascending priority; plain text when nothing matches.
pub static TEXT_RULES: &[ClassificationRule] = &[
    ClassificationRule {
        priority: 10,
        name: "declared-json",
        predicate: |input| {
            input
                .media_essence()
                .is_some_and(|m| m == "application/json" || m.ends_with("+json"))
        },
        kind: ContentKind::Json,
    },
    ClassificationRule {
        priority: 11,
        name: "declared-markdown",
        predicate: |input| {
            input
                .media_essence()
                .is_some_and(|m| m == "text/markdown" || m == "text/x-markdown")
        },
        kind: ContentKind::Markdown,
    },
    ClassificationRule {
        priority: 12,
        name: "declared-html",
        predicate: |input| {
            input
                .media_essence()
                .is_some_and(|m| m == "text/html" || m == "application/xhtml+xml")
        },
        kind: ContentKind::Html,
    },
    ClassificationRule {
        priority: 13,
        name: "declared-code",
        predicate: |input| input.media_type.and_then(language_from_media_type).is_some(),
        kind: ContentKind::Code,
    },
    ClassificationRule {
        priority: 14,
        name: "declared-plain",
        predicate: |input| input.media_essence().is_some_and(|m| m == "text/plain"),
        kind: ContentKind::Text,
    },
    ClassificationRule {
        priority: 20,
        name: "json-parseable",
        predicate: |input| parse_json_container(input.text).is_some(),
        kind: ContentKind::Json,
    },
    ClassificationRule {
        priority: 30,
        name: "markdown-signals",
        predicate: |input| has_markdown_signal(input.text),
        kind: ContentKind::Markdown,
    },
    ClassificationRule {
        priority: 40,
        name: "html-tags",
        predicate: |input| has_matching_html_tags(input.text),
        kind: ContentKind::Html,
    },
    ClassificationRule {
        priority: 50,
        name: "code-signals",
        predicate: |input| code_signal_count(input.text) >= 2,
        kind: ContentKind::Code,
    },
];

fn regex(src: &str) -> Regex {
    Regex::new(src).expect("classifier pattern must compile")
}

static MARKDOWN_SIGNALS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // heading
        regex(r"(?m)^#{1,6}\s+\S"),
        // list item
        regex(r"(?m)^\s*(?:[-*+]|\d+\.)\s+\S"),
        // link
        regex(r"\[[^\]\n]+\]\([^)\s]+\)"),
        // fenced code
        regex(r"(?m)^\s*```"),
        // inline code
        regex(r"`[^`\n]+`"),
        // emphasis
        regex(r"\*\*[^*\n]+\*\*|__[^_\n]+__|(?:^|\s)\*[^*\s][^*\n]*\*(?:\s|$|[.,;:!?])"),
    ]
});

static HTML_OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| regex(r"<([a-zA-Z][a-zA-Z0-9]*)\b[^>]*>"));

static CODE_KEYWORD_LINE: LazyLock<Regex> = LazyLock::new(|| {
    regex(
        r"(?m)^\s*(?:fn|pub|let|const|use|impl|struct|enum|mod|def|class|import|from|return|if|for|while|func|package|public|private|protected|function|var|export|#include)\b",
    )
});

static INDENTED_LINE: LazyLock<Regex> = LazyLock::new(|| regex(r"^(?: {2,}|\t)\S"));

/// Classify a text payload
pub fn classify_text(text: &str, media_type: Option<&str>) -> RichContentItem {
    let input = TextInput { text, media_type };
    let kind = TEXT_RULES
        .iter()
        .find(|rule| (rule.predicate)(&input))
        .map_or(ContentKind::Text, |rule| rule.kind);
    build_text_item(kind, text, media_type)
}

/// Name of the first rule that matches, for logging
pub fn matching_rule(text: &str, media_type: Option<&str>) -> Option<&'static str> {
    let input = TextInput { text, media_type };
    TEXT_RULES
        .iter()
        .find(|rule| (rule.predicate)(&input))
        .map(|rule| rule.name)
}

fn build_text_item(kind: ContentKind, text: &str, media_type: Option<&str>) -> RichContentItem {
    let text_owned = text.to_string();
    match kind {
        ContentKind::Json => match serde_json::from_str(text.trim()) {
            Ok(value) => RichContentItem::Json {
                text: text_owned,
                value,
            },
            // Declared JSON that does not parse is kept as text
            Err(_) => RichContentItem::Text { text: text_owned },
        },
        ContentKind::Markdown => RichContentItem::Markdown { text: text_owned },
        ContentKind::Html => RichContentItem::Html { text: text_owned },
        ContentKind::Code => RichContentItem::Code {
            language: detect_language(text, media_type),
            text: text_owned,
        },
        _ => RichContentItem::Text { text: text_owned },
    }
}

/// Classify an inline binary payload by media type alone
pub fn classify_binary(
    mime_type: &str,
    data: Option<String>,
    uri: Option<String>,
) -> RichContentItem {
    if mime_type.trim().to_ascii_lowercase().starts_with("image/") {
        RichContentItem::Image {
            mime_type: mime_type.to_string(),
            data,
            uri,
        }
    } else {
        RichContentItem::File {
            uri,
            mime_type: Some(mime_type.to_string()),
            text: None,
        }
    }
}

/// Classify a resource reference by its URI
pub fn classify_resource(
    uri: &str,
    mime_type: Option<&str>,
    text: Option<&str>,
) -> RichContentItem {
    let lowered = uri.trim().to_ascii_lowercase();
    if lowered.starts_with("http://") || lowered.starts_with("https://") {
        return RichContentItem::Link {
            url: uri.to_string(),
            text: text.map(str::to_string),
        };
    }
    if lowered.starts_with("file:") || looks_like_path(uri) {
        return RichContentItem::File {
            uri: Some(uri.to_string()),
            mime_type: mime_type.map(str::to_string),
            text: text.map(str::to_string),
        };
    }
    match text {
        Some(t) => RichContentItem::Text {
            text: t.to_string(),
        },
        None => RichContentItem::Text {
            text: uri.to_string(),
        },
    }
}

fn looks_like_path(uri: &str) -> bool {
    uri.starts_with('/')
        || uri.starts_with("./")
        || uri.starts_with("../")
        || uri.starts_with("~/")
        || (uri.len() > 2 && uri.as_bytes()[1] == b':' && matches!(uri.as_bytes()[2], b'\\' | b'/'))
}

fn parse_json_container(text: &str) -> Option<serde_json::Value> {
    let trimmed = text.trim();
    let starts = trimmed.starts_with('{') || trimmed.starts_with('[');
    if !starts {
        return None;
    }
    serde_json::from_str::<serde_json::Value>(trimmed)
        .ok()
        .filter(|v| v.is_object() || v.is_array())
}

fn has_markdown_signal(text: &str) -> bool {
    MARKDOWN_SIGNALS.iter().any(|re| re.is_match(text))
}

fn has_matching_html_tags(text: &str) -> bool {
    let lowered = text.to_ascii_lowercase();
    HTML_OPEN_TAG.captures_iter(text).any(|caps| {
        caps.get(1).is_some_and(|name| {
            lowered.contains(&format!("</{}>", name.as_str().to_ascii_lowercase()))
        })
    })
}

/// Number of independent code signals present in `text`
fn code_signal_count(text: &str) -> usize {
    let keyword = CODE_KEYWORD_LINE.is_match(text);

    let non_ws = text.chars().filter(|c| !c.is_whitespace()).count();
    let punct = text
        .chars()
        .filter(|c| matches!(c, '{' | '}' | '[' | ']' | '(' | ')' | ';'))
        .count();
    let dense = punct >= 4 && non_ws > 0 && punct as f64 / non_ws as f64 >= 0.05;

    let arrow = text.contains("->") || text.contains("=>");

    let mut run = 0;
    let mut longest_run = 0;
    for line in text.lines() {
        if INDENTED_LINE.is_match(line) {
            run += 1;
            longest_run = longest_run.max(run);
        } else {
            run = 0;
        }
    }
    let indentation = longest_run >= 2;

    [keyword, dense, arrow, indentation]
        .into_iter()
        .filter(|signal| *signal)
        .count()
}
