//! `web_fetch`: download a page and reduce it to readable text.
//!
//! HTML is flattened with block elements mapped to line breaks so headings,
//! paragraphs and list items stay on their own lines. Other text bodies are
//! returned as-is and classified into rich content.

use std::sync::LazyLock;
use std::time::Instant;

use scraper::{ElementRef, Html, Node, Selector};
use toolgate_application::ExecutionContext;
use toolgate_domain::text::truncate_str;
use toolgate_domain::{
    ApprovalType, ToolCall, ToolDefinition, ToolError, ToolParameter, ToolResult,
    ToolResultMetadata, classify_text,
};
use tracing::debug;

use crate::tools::{ToolEnv, cancellable};

pub const WEB_FETCH: &str = "web_fetch";

/// Bodies above this are refused, 5 MiB
const BODY_LIMIT: usize = 5 * 1024 * 1024;

const DEFAULT_MAX_LENGTH: usize = 50 * 1024;

const USER_AGENT: &str = concat!("toolgate/", env!("CARGO_PKG_VERSION"));

static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("static selector"));

/// Subtrees that never contain readable text
const HIDDEN: &[&str] = &["script", "style", "noscript", "svg", "template", "head"];

/// Elements that start on a new line
const BLOCKS: &[&str] = &[
    "p", "div", "section", "article", "header", "footer", "main", "nav", "aside", "h1", "h2",
    "h3", "h4", "h5", "h6", "li", "ul", "ol", "tr", "table", "pre", "blockquote", "br", "hr",
    "dt", "dd", "figure",
];

pub fn web_fetch_definition() -> ToolDefinition {
    ToolDefinition::new(
        WEB_FETCH,
        "Download an http(s) URL. HTML pages are reduced to their readable text; \
         other text bodies are returned verbatim.",
        ApprovalType::None,
    )
    .with_parameter(ToolParameter::new("url", "The http(s) URL to fetch", true))
    .with_parameter(
        ToolParameter::new(
            "max_length",
            "Cap on returned text in bytes (default 51200)",
            false,
        )
        .with_type("integer"),
    )
}

struct Fetched {
    status: u16,
    content_type: String,
    body: Vec<u8>,
}

impl Fetched {
    fn media_type(&self) -> Option<&str> {
        self.content_type
            .split(';')
            .next()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }

    fn is_html(&self) -> bool {
        matches!(self.media_type(), Some("text/html" | "application/xhtml+xml"))
    }
}

fn check_url(raw: &str) -> Result<reqwest::Url, ToolError> {
    let url = reqwest::Url::parse(raw.trim())
        .map_err(|e| ToolError::validation(format!("invalid URL '{}': {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ToolError::validation(format!(
            "unsupported URL scheme '{}': only http and https are fetched",
            other
        ))),
    }
}

fn too_large(bytes: u64) -> ToolError {
    ToolError::execution_failed(format!(
        "response body is {} bytes, over the {} byte limit",
        bytes, BODY_LIMIT
    ))
}

async fn fetch(env: &ToolEnv, url: reqwest::Url) -> Result<Fetched, ToolError> {
    let response = env
        .http
        .get(url)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .send()
        .await
        .map_err(|e| ToolError::execution_failed(format!("request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ToolError::execution_failed(format!("server answered {}", status)));
    }
    if let Some(len) = response.content_length().filter(|l| *l > BODY_LIMIT as u64) {
        return Err(too_large(len));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let body = response
        .bytes()
        .await
        .map_err(|e| ToolError::execution_failed(format!("reading the body failed: {}", e)))?;
    if body.len() > BODY_LIMIT {
        return Err(too_large(body.len() as u64));
    }
    Ok(Fetched {
        status: status.as_u16(),
        content_type,
        body: body.to_vec(),
    })
}

pub async fn execute_web_fetch(
    env: &ToolEnv,
    call: &ToolCall,
    ctx: &mut ExecutionContext,
) -> ToolResult {
    let started = Instant::now();
    let url = match call
        .require_string("url")
        .map_err(ToolError::validation)
        .and_then(check_url)
    {
        Ok(url) => url,
        Err(e) => return ToolResult::failure(WEB_FETCH, e),
    };
    let max_length = match call.get_i64("max_length") {
        Some(n) if n > 0 => n as usize,
        _ => DEFAULT_MAX_LENGTH,
    };

    debug!(url = %url, "Fetching");
    let page = match cancellable(ctx.cancellation(), fetch(env, url.clone())).await {
        Ok(Ok(page)) => page,
        Ok(Err(e)) | Err(e) => return ToolResult::failure(WEB_FETCH, e),
    };

    let raw = String::from_utf8_lossy(&page.body);
    let text = if page.is_html() {
        html_to_text(&raw)
    } else {
        raw.into_owned()
    };
    let total = text.len();
    let body = if total > max_length {
        format!(
            "{}\n\n[truncated: showing {} of {} bytes]",
            truncate_str(&text, max_length),
            max_length,
            total
        )
    } else {
        text
    };

    let rich = if page.is_html() {
        Vec::new()
    } else {
        vec![classify_text(&body, page.media_type())]
    };
    let content_type = page.media_type().unwrap_or("unknown");
    ToolResult::success(
        WEB_FETCH,
        format!(
            "## Fetched: {}\n\nStatus: {} · {} · {} bytes of text\n\n{}",
            url, page.status, content_type, total, body
        ),
    )
    .with_metadata(ToolResultMetadata {
        duration_ms: Some(started.elapsed().as_millis() as u64),
        bytes: Some(page.body.len()),
        ..Default::default()
    })
    .with_rich_content(rich)
}

/// Readable text of an HTML document: body text only, one line per block
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let root = document
        .select(&BODY)
        .next()
        .unwrap_or_else(|| document.root_element());
    let mut out = TextBuilder::default();
    out.walk(root);
    out.finish()
}

/// Accumulates words, turning block boundaries into at most one blank line
#[derive(Default)]
struct TextBuilder {
    lines: Vec<String>,
    current: String,
}

impl TextBuilder {
    fn walk(&mut self, element: ElementRef) {
        let name = element.value().name();
        if HIDDEN.contains(&name) {
            return;
        }
        let block = BLOCKS.contains(&name);
        if block {
            self.break_line();
        }
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.words(text),
                Node::Element(_) => {
                    if let Some(el) = ElementRef::wrap(child) {
                        self.walk(el);
                    }
                }
                _ => {}
            }
        }
        if block {
            self.break_line();
        }
    }

    fn words(&mut self, text: &str) {
        for word in text.split_whitespace() {
            if !self.current.is_empty() {
                self.current.push(' ');
            }
            self.current.push_str(word);
        }
    }

    fn break_line(&mut self) {
        if !self.current.is_empty() {
            self.lines.push(std::mem::take(&mut self.current));
        }
    }

    fn finish(mut self) -> String {
        self.break_line();
        self.lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::workspace;
    use toolgate_domain::ErrorKind;

    #[test]
    fn hidden_subtrees_are_dropped() {
        let html = r#"
        <html><head><title>Title</title></head><body>
            <script>track();</script>
            <style>p { margin: 0 }</style>
            <h1>Release notes</h1>
            <p>Faster   builds
               and fewer bugs.</p>
            <noscript>enable js</noscript>
        </body></html>
        "#;
        assert_eq!(html_to_text(html), "Release notes\nFaster builds and fewer bugs.");
    }

    #[test]
    fn inline_elements_stay_on_one_line() {
        let html = "<body><ul><li>one <b>bold</b> item</li><li>two</li></ul></body>";
        assert_eq!(html_to_text(html), "one bold item\ntwo");
    }

    #[test]
    fn empty_document() {
        assert_eq!(html_to_text(""), "");
    }

    #[tokio::test]
    async fn non_http_schemes_are_rejected() {
        let (_dir, mut ctx) = workspace();
        for url in ["file:///etc/passwd", "ftp://example.com/x", "not a url"] {
            let call = ToolCall::new(WEB_FETCH).with_arg("url", url);
            let result = execute_web_fetch(&ToolEnv::local(), &call, &mut ctx).await;
            assert_eq!(result.error_kind(), Some(ErrorKind::Validation), "{url}");
        }
    }
}
