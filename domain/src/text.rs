//! Text helpers shared by the edit engine and executors.

/// Line-ending style of a text file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    /// Detect from the first line break; files without one are treated as LF
    pub fn detect(content: &str) -> Self {
        match content.find('\n') {
            Some(idx) if idx > 0 && content.as_bytes()[idx - 1] == b'\r' => LineEnding::CrLf,
            _ => LineEnding::Lf,
        }
    }

    /// Convert LF-normalized text back to this style
    pub fn apply(&self, normalized: &str) -> String {
        match self {
            LineEnding::Lf => normalized.to_string(),
            LineEnding::CrLf => normalized.replace('\n', "\r\n"),
        }
    }
}

/// Replace every CRLF (and lone CR) with LF
pub fn normalize_line_endings(s: &str) -> String {
    if !s.contains('\r') {
        return s.to_string();
    }
    s.replace("\r\n", "\n").replace('\r', "\n")
}

/// Truncate to at most `max_bytes` without splitting a UTF-8 character.
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Truncate for display, appending a marker with the number of bytes dropped
pub fn truncate_with_notice(s: &str, max_bytes: usize) -> String {
    let kept = truncate_str(s, max_bytes);
    if kept.len() == s.len() {
        return s.to_string();
    }
    format!(
        "{}\n... [truncated, {} more bytes]",
        kept,
        s.len() - kept.len()
    )
}

/// 1-based line number of a byte offset
pub fn line_number_at(content: &str, byte_offset: usize) -> usize {
    let end = byte_offset.min(content.len());
    content.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() + 1
}
