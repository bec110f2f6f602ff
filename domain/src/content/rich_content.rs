//! Rich content items attached to tool results.

use serde::{Deserialize, Serialize};

/// The fixed set of content kinds a result item can be classified as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Text,
    Markdown,
    Html,
    Json,
    Code,
    Image,
    File,
    Link,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Markdown => "markdown",
            ContentKind::Html => "html",
            ContentKind::Json => "json",
            ContentKind::Code => "code",
            ContentKind::Image => "image",
            ContentKind::File => "file",
            ContentKind::Link => "link",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified piece of external tool output.
///
/// Text-bearing variants keep the original text verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RichContentItem {
    Text {
        text: String,
    },
    Markdown {
        text: String,
    },
    Html {
        text: String,
    },
    Json {
        text: String,
        value: serde_json::Value,
    },
    Code {
        text: String,
        language: String,
    },
    Image {
        mime_type: String,
        /// Base64 payload as delivered by the provider
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        uri: Option<String>,
    },
    File {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        uri: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    Link {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
}

impl RichContentItem {
    pub fn kind(&self) -> ContentKind {
        match self {
            RichContentItem::Text { .. } => ContentKind::Text,
            RichContentItem::Markdown { .. } => ContentKind::Markdown,
            RichContentItem::Html { .. } => ContentKind::Html,
            RichContentItem::Json { .. } => ContentKind::Json,
            RichContentItem::Code { .. } => ContentKind::Code,
            RichContentItem::Image { .. } => ContentKind::Image,
            RichContentItem::File { .. } => ContentKind::File,
            RichContentItem::Link { .. } => ContentKind::Link,
        }
    }

    /// Original text, when the item carries any
    pub fn text(&self) -> Option<&str> {
        match self {
            RichContentItem::Text { text }
            | RichContentItem::Markdown { text }
            | RichContentItem::Html { text }
            | RichContentItem::Json { text, .. }
            | RichContentItem::Code { text, .. } => Some(text.as_str()),
            RichContentItem::File { text, .. } | RichContentItem::Link { text, .. } => {
                text.as_deref()
            }
            RichContentItem::Image { .. } => None,
        }
    }

    /// Plain-text rendering for the model transcript
    pub fn summary(&self) -> String {
        match self {
            RichContentItem::Image { mime_type, uri, .. } => match uri {
                Some(uri) => format!("[image {} at {}]", mime_type, uri),
                None => format!("[image {}]", mime_type),
            },
            RichContentItem::File {
                uri, text: None, ..
            } => format!("[file {}]", uri.as_deref().unwrap_or("<inline>")),
            RichContentItem::Link { url, text: None } => url.clone(),
            other => other.text().unwrap_or_default().to_string(),
        }
    }
}
