//! Multi-strategy text substitution for model-generated edits.
//!
//! Strategies are tried in order until one produces a match:
//!
//! 1. **exact**: literal substring
//! 2. **normalized-whitespace**: runs of horizontal whitespace collapsed,
//!    trailing whitespace and line endings unified, match mapped back to the
//!    original byte range
//! 3. **fuzzy**: character diff ratio against every window with the same line
//!    count, accepted at [`FUZZY_THRESHOLD`]. Windows whose character
//!    histogram cannot reach the best score are skipped, and the scan gives
//!    up without accepting anything once [`FUZZY_SCAN_LIMIT`] has passed.
//! 4. **line-based**: trimmed line-by-line comparison ignoring blank lines
//!    around the needle
//!
//! Multiple matches never get guessed at: unless `replace_all` is set the
//! edit fails as ambiguous and reports where the candidates are.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use similar::TextDiff;
use thiserror::Error;

use crate::text::line_number_at;

/// Minimum similarity for the fuzzy strategy to accept a window
pub const FUZZY_THRESHOLD: f64 = 0.85;

/// Wall-clock limit for the fuzzy scan over all windows
pub const FUZZY_SCAN_LIMIT: Duration = Duration::from_secs(2);

const SCORE_EPSILON: f64 = 1e-9;

/// A requested substitution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditAttempt {
    pub old_text: String,
    pub new_text: String,
    #[serde(default)]
    pub replace_all: bool,
}

impl EditAttempt {
    pub fn new(old_text: impl Into<String>, new_text: impl Into<String>) -> Self {
        Self {
            old_text: old_text.into(),
            new_text: new_text.into(),
            replace_all: false,
        }
    }

    pub fn with_replace_all(mut self, replace_all: bool) -> Self {
        self.replace_all = replace_all;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EditStrategy {
    Exact,
    NormalizedWhitespace,
    Fuzzy,
    LineBased,
}

impl EditStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditStrategy::Exact => "exact",
            EditStrategy::NormalizedWhitespace => "normalized-whitespace",
            EditStrategy::Fuzzy => "fuzzy",
            EditStrategy::LineBased => "line-based",
        }
    }
}

impl std::fmt::Display for EditStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful substitution
#[derive(Debug, Clone, PartialEq)]
pub struct EditOutcome {
    pub strategy: EditStrategy,
    pub new_content: String,
    pub replacements: usize,
    /// 1.0 for every strategy except fuzzy
    pub similarity: f64,
}

/// Closest candidate seen while searching, for "did you mean" hints
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestMatch {
    /// 1-based line where the candidate window starts
    pub line: usize,
    pub similarity: f64,
}

impl BestMatch {
    pub fn percent(&self) -> u32 {
        (self.similarity * 100.0).round() as u32
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditFailure {
    #[error("old_text must not be empty")]
    EmptyOldText,

    #[error("replacement produced no changes")]
    NoChanges,

    #[error(
        "old_text matches {} locations ({} match at lines {}); add surrounding context to make it unique or set replace_all",
        .lines.len(),
        .strategy,
        join_lines(.lines)
    )]
    Ambiguous {
        strategy: EditStrategy,
        lines: Vec<usize>,
    },

    #[error("old_text not found{}", best_match_hint(.best_match))]
    NotFound { best_match: Option<BestMatch> },
}

impl EditFailure {
    pub fn best_match(&self) -> Option<BestMatch> {
        match self {
            EditFailure::NotFound { best_match } => *best_match,
            _ => None,
        }
    }
}

fn join_lines(lines: &[usize]) -> String {
    lines
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn best_match_hint(best: &Option<BestMatch>) -> String {
    match best {
        Some(m) => format!(
            "; closest candidate starts at line {} ({}% similar)",
            m.line,
            m.percent()
        ),
        None => String::new(),
    }
}

/// Apply `attempt` to `content`, trying each strategy in turn
pub fn smart_replace(content: &str, attempt: &EditAttempt) -> Result<EditOutcome, EditFailure> {
    if attempt.old_text.is_empty() {
        return Err(EditFailure::EmptyOldText);
    }

    if let Some(outcome) = try_exact(content, attempt)? {
        return ensure_changed(content, outcome);
    }
    if let Some(outcome) = try_normalized(content, attempt)? {
        return ensure_changed(content, outcome);
    }

    let fuzzy = try_fuzzy(content, attempt)?;
    if let Some(outcome) = fuzzy.outcome {
        return ensure_changed(content, outcome);
    }

    if let Some(outcome) = try_line_based(content, attempt)? {
        return ensure_changed(content, outcome);
    }

    Err(EditFailure::NotFound {
        best_match: fuzzy.best,
    })
}

fn ensure_changed(content: &str, outcome: EditOutcome) -> Result<EditOutcome, EditFailure> {
    if outcome.new_content == content {
        Err(EditFailure::NoChanges)
    } else {
        Ok(outcome)
    }
}

/// Splice `replacement` into every `(start, end)` byte range.
///
/// Ranges must be sorted and non-overlapping. Zero ranges means no match.
fn apply_ranges(
    content: &str,
    ranges: &[(usize, usize)],
    replacement: &str,
    replace_all: bool,
    strategy: EditStrategy,
    similarity: f64,
) -> Result<Option<EditOutcome>, EditFailure> {
    if ranges.is_empty() {
        return Ok(None);
    }
    if ranges.len() > 1 && !replace_all {
        return Err(EditFailure::Ambiguous {
            strategy,
            lines: ranges
                .iter()
                .map(|(start, _)| line_number_at(content, *start))
                .collect(),
        });
    }

    let mut new_content = String::with_capacity(content.len() + replacement.len());
    let mut last = 0;
    for (start, end) in ranges {
        new_content.push_str(&content[last..*start]);
        new_content.push_str(replacement);
        last = *end;
    }
    new_content.push_str(&content[last..]);

    Ok(Some(EditOutcome {
        strategy,
        new_content,
        replacements: ranges.len(),
        similarity,
    }))
}

fn try_exact(content: &str, attempt: &EditAttempt) -> Result<Option<EditOutcome>, EditFailure> {
    let ranges: Vec<(usize, usize)> = content
        .match_indices(attempt.old_text.as_str())
        .map(|(idx, m)| (idx, idx + m.len()))
        .collect();
    apply_ranges(
        content,
        &ranges,
        &attempt.new_text,
        attempt.replace_all,
        EditStrategy::Exact,
        1.0,
    )
}

fn try_normalized(
    content: &str,
    attempt: &EditAttempt,
) -> Result<Option<EditOutcome>, EditFailure> {
    let needle = NormalizedText::build(&attempt.old_text);
    if needle.text.trim().is_empty() {
        return Ok(None);
    }
    let haystack = NormalizedText::build(content);
    let ranges: Vec<(usize, usize)> = haystack
        .text
        .match_indices(needle.text.as_str())
        .map(|(idx, m)| haystack.original_range(idx, idx + m.len()))
        .collect();
    apply_ranges(
        content,
        &ranges,
        &attempt.new_text,
        attempt.replace_all,
        EditStrategy::NormalizedWhitespace,
        1.0,
    )
}

#[derive(Default)]
struct FuzzySearch {
    outcome: Option<EditOutcome>,
    best: Option<BestMatch>,
}

fn try_fuzzy(content: &str, attempt: &EditAttempt) -> Result<FuzzySearch, EditFailure> {
    let needle = attempt.old_text.trim_end_matches(['\n', '\r']);
    if needle.trim().is_empty() {
        return Ok(FuzzySearch::default());
    }
    let window_len = needle.lines().count().max(1);
    let lines = line_spans(content);
    if lines.len() < window_len {
        return Ok(FuzzySearch::default());
    }

    let needle_histogram = CharHistogram::of(needle);
    let deadline = Instant::now() + FUZZY_SCAN_LIMIT;
    let mut timed_out = false;
    let mut best_score = 0.0_f64;
    let mut best_windows: Vec<usize> = Vec::new();

    for first in 0..=(lines.len() - window_len) {
        if Instant::now() >= deadline {
            timed_out = true;
            break;
        }
        let start = lines[first].0;
        let end = lines[first + window_len - 1].1;
        let window = &content[start..end];

        // ratio = 2 * matches / total and matches never exceed the shared
        // characters, so the histogram overlap caps the score
        let (shared, total) = needle_histogram.overlap(window);
        if total == 0 {
            continue;
        }
        let upper_bound = 2.0 * shared as f64 / total as f64;
        if upper_bound + SCORE_EPSILON < best_score || upper_bound == 0.0 {
            continue;
        }

        let score = f64::from(
            TextDiff::configure()
                .deadline(deadline)
                .diff_chars(needle, window)
                .ratio(),
        );
        if score > best_score + SCORE_EPSILON {
            best_score = score;
            best_windows.clear();
            best_windows.push(first);
        } else if (score - best_score).abs() <= SCORE_EPSILON && score > 0.0 {
            best_windows.push(first);
        }
    }
    // Diffs cut short by the deadline under-report, so nothing is accepted
    timed_out |= Instant::now() >= deadline;

    let Some(&first) = best_windows.first() else {
        return Ok(FuzzySearch::default());
    };
    let best = BestMatch {
        line: first + 1,
        similarity: best_score,
    };

    if timed_out || best_score + SCORE_EPSILON < FUZZY_THRESHOLD {
        return Ok(FuzzySearch {
            outcome: None,
            best: Some(best),
        });
    }
    if best_windows.len() > 1 {
        return Err(EditFailure::Ambiguous {
            strategy: EditStrategy::Fuzzy,
            lines: best_windows.iter().map(|w| w + 1).collect(),
        });
    }

    let replacement = if attempt.old_text.ends_with('\n') {
        attempt
            .new_text
            .strip_suffix('\n')
            .unwrap_or(&attempt.new_text)
    } else {
        attempt.new_text.as_str()
    };
    let range = (lines[first].0, lines[first + window_len - 1].1);
    let outcome = apply_ranges(
        content,
        &[range],
        replacement,
        false,
        EditStrategy::Fuzzy,
        best_score,
    )?;

    Ok(FuzzySearch {
        outcome,
        best: Some(best),
    })
}

fn try_line_based(
    content: &str,
    attempt: &EditAttempt,
) -> Result<Option<EditOutcome>, EditFailure> {
    let needle: Vec<&str> = strip_blank_edges(&attempt.old_text)
        .into_iter()
        .map(str::trim)
        .collect();
    if needle.is_empty() {
        return Ok(None);
    }
    let lines = line_spans(content);
    if lines.len() < needle.len() {
        return Ok(None);
    }

    let mut ranges = Vec::new();
    let mut first = 0;
    while first + needle.len() <= lines.len() {
        let matched = needle.iter().enumerate().all(|(offset, expected)| {
            let (start, end) = lines[first + offset];
            content[start..end].trim() == *expected
        });
        if matched {
            ranges.push((lines[first].0, lines[first + needle.len() - 1].1));
            first += needle.len();
        } else {
            first += 1;
        }
    }

    let replacement = strip_blank_edges(&attempt.new_text).join("\n");
    apply_ranges(
        content,
        &ranges,
        &replacement,
        attempt.replace_all,
        EditStrategy::LineBased,
        1.0,
    )
}

/// Character counts of the fuzzy needle
struct CharHistogram {
    counts: HashMap<char, usize>,
    len: usize,
}

impl CharHistogram {
    fn of(text: &str) -> Self {
        let mut counts = HashMap::new();
        let mut len = 0;
        for c in text.chars() {
            *counts.entry(c).or_insert(0) += 1;
            len += 1;
        }
        Self { counts, len }
    }

    /// (characters `other` shares with this histogram, combined length)
    fn overlap(&self, other: &str) -> (usize, usize) {
        let mut remaining = self.counts.clone();
        let mut shared = 0;
        let mut other_len = 0;
        for c in other.chars() {
            other_len += 1;
            if let Some(n) = remaining.get_mut(&c).filter(|n| **n > 0) {
                *n -= 1;
                shared += 1;
            }
        }
        (shared, self.len + other_len)
    }
}

/// Byte spans of each line, excluding the terminator
fn line_spans(content: &str) -> Vec<(usize, usize)> {
    let bytes = content.as_bytes();
    let mut spans = Vec::new();
    let mut start = 0;
    for (idx, byte) in bytes.iter().enumerate() {
        if *byte == b'\n' {
            let end = if idx > start && bytes[idx - 1] == b'\r' {
                idx - 1
            } else {
                idx
            };
            spans.push((start, end));
            start = idx + 1;
        }
    }
    if start < content.len() {
        spans.push((start, content.len()));
    }
    spans
}

/// Lines of `s` without leading and trailing whitespace-only lines
fn strip_blank_edges(s: &str) -> Vec<&str> {
    let lines: Vec<&str> = s.lines().collect();
    let Some(first) = lines.iter().position(|l| !l.trim().is_empty()) else {
        return Vec::new();
    };
    let last = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .unwrap_or(first);
    lines[first..=last].to_vec()
}

/// Whitespace-normalized text with a map back to original byte ranges.
///
/// Every byte of `text` has an entry in `spans` giving the original range it
/// stands for. A collapsed whitespace run is one space covering the whole
/// run; whitespace before a line break is folded into the break.
struct NormalizedText {
    text: String,
    spans: Vec<(usize, usize)>,
}

impl NormalizedText {
    fn build(source: &str) -> Self {
        let mut text = String::with_capacity(source.len());
        let mut spans = Vec::with_capacity(source.len());
        let mut pending_ws: Option<(usize, usize)> = None;
        let mut chars = source.char_indices().peekable();

        while let Some((idx, c)) = chars.next() {
            let end = idx + c.len_utf8();
            if c == '\n' || c == '\r' {
                let mut break_end = end;
                if c == '\r' && matches!(chars.peek(), Some((_, '\n'))) {
                    chars.next();
                    break_end += 1;
                }
                let start = pending_ws.take().map_or(idx, |(ws_start, _)| ws_start);
                text.push('\n');
                spans.push((start, break_end));
            } else if c.is_whitespace() {
                pending_ws = Some(match pending_ws {
                    Some((ws_start, _)) => (ws_start, end),
                    None => (idx, end),
                });
            } else {
                if let Some(run) = pending_ws.take() {
                    text.push(' ');
                    spans.push(run);
                }
                text.push(c);
                spans.extend(std::iter::repeat_n((idx, end), c.len_utf8()));
            }
        }

        Self { text, spans }
    }

    /// Original byte range covered by normalized range `start..end` (non-empty)
    fn original_range(&self, start: usize, end: usize) -> (usize, usize) {
        (self.spans[start].0, self.spans[end - 1].1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_unique_replace_changes_only_target() {
        let content = "fn main() {\n    println!(\"hi\");\n}\n";
        let attempt = EditAttempt::new("println!(\"hi\")", "println!(\"bye\")");
        let outcome = smart_replace(content, &attempt).unwrap();
        assert_eq!(outcome.strategy, EditStrategy::Exact);
        assert_eq!(outcome.replacements, 1);
        assert_eq!(
            outcome.new_content,
            "fn main() {\n    println!(\"bye\");\n}\n"
        );
    }

    #[test]
    fn exact_ambiguous_reports_lines() {
        let content = "let x = 1;\nlet y = 2;\nlet x = 1;\n";
        let err =
            smart_replace(content, &EditAttempt::new("let x = 1;", "let x = 3;")).unwrap_err();
        match &err {
            EditFailure::Ambiguous { strategy, lines } => {
                assert_eq!(*strategy, EditStrategy::Exact);
                assert_eq!(lines, &vec![1, 3]);
            }
            other => panic!("unexpected failure: {other:?}"),
        }
        assert!(err.to_string().contains("lines 1, 3"));
    }

    #[test]
    fn exact_replace_all() {
        let content = "a = 1\nb = 2\na = 1\n";
        let attempt = EditAttempt::new("a = 1", "a = 9").with_replace_all(true);
        let outcome = smart_replace(content, &attempt).unwrap();
        assert_eq!(outcome.replacements, 2);
        assert_eq!(outcome.new_content, "a = 9\nb = 2\na = 9\n");
    }

    #[test]
    fn empty_old_text_is_rejected() {
        let err = smart_replace("abc", &EditAttempt::new("", "x")).unwrap_err();
        assert_eq!(err, EditFailure::EmptyOldText);
    }

    #[test]
    fn identical_replacement_is_no_change() {
        let err = smart_replace("abc", &EditAttempt::new("b", "b")).unwrap_err();
        assert_eq!(err, EditFailure::NoChanges);
    }

    #[test]
    fn normalized_whitespace_maps_back_to_original() {
        let content = "fn add(a: i32,   b: i32) -> i32 {\n\ta + b   \n}\n";
        let attempt = EditAttempt::new(
            "fn add(a: i32, b: i32) -> i32 {\n    a + b\n}",
            "fn add(a: i32, b: i32) -> i32 {\n    b + a\n}",
        );
        let outcome = smart_replace(content, &attempt).unwrap();
        assert_eq!(outcome.strategy, EditStrategy::NormalizedWhitespace);
        assert_eq!(
            outcome.new_content,
            "fn add(a: i32, b: i32) -> i32 {\n    b + a\n}\n"
        );
    }

    #[test]
    fn normalized_handles_crlf_needle() {
        let content = "alpha\nbeta\ngamma\n";
        let attempt = EditAttempt::new("alpha\r\nbeta", "ALPHA\nBETA");
        let outcome = smart_replace(content, &attempt).unwrap();
        assert_eq!(outcome.strategy, EditStrategy::NormalizedWhitespace);
        assert_eq!(outcome.new_content, "ALPHA\nBETA\ngamma\n");
    }

    #[test]
    fn normalized_ambiguous() {
        let content = "x  = 1\ny = 2\nx = 1\n";
        let err = smart_replace(content, &EditAttempt::new("x   = 1", "x = 5")).unwrap_err();
        assert!(matches!(
            err,
            EditFailure::Ambiguous {
                strategy: EditStrategy::NormalizedWhitespace,
                ..
            }
        ));
    }

    #[test]
    fn fuzzy_accepts_close_match() {
        let content = "fn compute_total(items: &[Item]) -> u64 {\n    items.iter().map(|i| i.price).sum()\n}\n";
        let attempt = EditAttempt::new(
            "fn compute_total(items: &[Item]) -> u64 {\n    items.iter().map(|i| i.cost).sum()\n}",
            "fn compute_total(items: &[Item]) -> u64 {\n    items.iter().map(|i| i.price * i.qty).sum()\n}",
        );
        let outcome = smart_replace(content, &attempt).unwrap();
        assert_eq!(outcome.strategy, EditStrategy::Fuzzy);
        assert!(outcome.similarity >= FUZZY_THRESHOLD);
        assert!(outcome.new_content.contains("i.price * i.qty"));
        assert!(outcome.new_content.ends_with("}\n"));
    }

    #[test]
    fn unmatched_edit_reports_best_match() {
        let content = "one\ntwo\nthree\nlet total = price * quantity;\nfive\n";
        let attempt = EditAttempt::new("let sum = cost + fee;", "let sum = 0;");
        let err = smart_replace(content, &attempt).unwrap_err();
        let best = err.best_match().expect("best match");
        assert_eq!(best.line, 4);
        assert!(best.similarity < FUZZY_THRESHOLD);
        assert!(err.to_string().contains("line 4"));
    }

    #[test]
    fn large_unmatched_edit_fails_within_scan_limit() {
        let content: String = (0..3000)
            .map(|i| format!("    let value_{i} = compute_something(input_{i}, {i}, &config);\n"))
            .collect();
        let old_text: String = (0..25)
            .map(|i| format!("    let other_{i} = unrelated_call(arg_{i}).await?;\n"))
            .collect();

        let started = Instant::now();
        let err = smart_replace(&content, &EditAttempt::new(old_text, "x")).unwrap_err();
        assert!(matches!(err, EditFailure::NotFound { .. }));
        assert!(
            started.elapsed() < FUZZY_SCAN_LIMIT + Duration::from_secs(8),
            "took {:?}",
            started.elapsed()
        );
    }

    #[test]
    fn histogram_overlap_bounds_the_ratio() {
        let histogram = CharHistogram::of("abcabc");
        assert_eq!(histogram.overlap("aab"), (3, 9));
        assert_eq!(histogram.overlap("xyz"), (0, 9));

        let ratio = f64::from(TextDiff::from_chars("abcabc", "cbacba").ratio());
        let (shared, total) = histogram.overlap("cbacba");
        assert!(ratio <= 2.0 * shared as f64 / total as f64);
    }

    #[test]
    fn fuzzy_needle_longer_than_file() {
        let err = smart_replace("one line", &EditAttempt::new("a\nb\nc", "x")).unwrap_err();
        assert_eq!(err, EditFailure::NotFound { best_match: None });
    }

    #[test]
    fn line_based_ignores_blank_edges() {
        let content = "start\n  first();\n  second();\nend\n";
        let attempt = EditAttempt::new("\n\nfirst();\nsecond();\n\n", "\n  both();\n");
        let outcome = smart_replace(content, &attempt).unwrap();
        assert_eq!(outcome.strategy, EditStrategy::LineBased);
        assert_eq!(outcome.new_content, "start\n  both();\nend\n");
    }

    #[test]
    fn failure_carries_no_content() {
        let content = "alpha\nbeta\n";
        let err = smart_replace(content, &EditAttempt::new("zzzzzz\nqqqq", "x")).unwrap_err();
        assert!(matches!(err, EditFailure::NotFound { .. }));
    }

    #[test]
    fn normalized_text_spans() {
        let norm = NormalizedText::build("a  b\t \nc");
        assert_eq!(norm.text, "a b\nc");
        assert_eq!(norm.original_range(1, 2), (1, 3));
        assert_eq!(norm.original_range(3, 4), (4, 7));
    }

    #[test]
    fn strategy_names() {
        assert_eq!(EditStrategy::NormalizedWhitespace.to_string(), "normalized-whitespace");
        assert_eq!(EditStrategy::LineBased.as_str(), "line-based");
    }
}
