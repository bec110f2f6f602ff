//! Replace an inclusive 1-based line range.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineRangeError {
    #[error("start_line must be >= 1 (got {start})")]
    StartBelowOne { start: i64 },

    #[error("end_line ({end}) must be >= start_line ({start})")]
    EndBeforeStart { start: i64, end: i64 },

    #[error(
        "line range {start}-{end} is out of bounds: file has {line_count} lines (valid range 1-{line_count})"
    )]
    OutOfRange {
        start: i64,
        end: i64,
        line_count: usize,
    },
}

/// Result of a line-range replacement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRangeEdit {
    pub new_content: String,
    pub lines_removed: usize,
    pub lines_added: usize,
}

/// Replace lines `start..=end` (1-based) with `new_text`.
///
/// Requires `1 <= start <= end <= line_count`; nothing is clamped. An empty
/// `new_text` deletes the lines. When the last replaced line was terminated
/// the replacement is terminated too, so the following line stays separate.
pub fn replace_line_range(
    content: &str,
    start: i64,
    end: i64,
    new_text: &str,
) -> Result<LineRangeEdit, LineRangeError> {
    if start < 1 {
        return Err(LineRangeError::StartBelowOne { start });
    }
    if end < start {
        return Err(LineRangeError::EndBeforeStart { start, end });
    }

    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let line_count = lines.len();
    if end as u64 > line_count as u64 {
        return Err(LineRangeError::OutOfRange {
            start,
            end,
            line_count,
        });
    }

    let first = (start - 1) as usize;
    let last = end as usize;

    let mut new_content = String::with_capacity(content.len() + new_text.len());
    new_content.extend(lines[..first].iter().copied());
    if !new_text.is_empty() {
        new_content.push_str(new_text);
        let terminated = lines[last - 1].ends_with('\n');
        if terminated && !new_text.ends_with('\n') {
            new_content.push('\n');
        }
    }
    new_content.extend(lines[last..].iter().copied());

    Ok(LineRangeEdit {
        new_content,
        lines_removed: last - first,
        lines_added: new_text.lines().count(),
    })
}
