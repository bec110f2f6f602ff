//! Text editing engine: fuzzy substitution and line-range replacement.

pub mod line_range;
pub mod smart_replace;

pub use line_range::{LineRangeEdit, LineRangeError, replace_line_range};
pub use smart_replace::{
    BestMatch, EditAttempt, EditFailure, EditOutcome, EditStrategy, FUZZY_THRESHOLD, smart_replace,
};

use similar::{ChangeTag, TextDiff};

/// Count of (added, removed) lines between two texts
pub fn line_diff_stats(before: &str, after: &str) -> (usize, usize) {
    let diff = TextDiff::from_lines(before, after);
    diff.iter_all_changes()
        .fold((0, 0), |(added, removed), change| match change.tag() {
            ChangeTag::Insert => (added + 1, removed),
            ChangeTag::Delete => (added, removed + 1),
            ChangeTag::Equal => (added, removed),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_stats_counts_lines() {
        assert_eq!(line_diff_stats("a\nb\nc\n", "a\nB\nc\nd\n"), (2, 1));
        assert_eq!(line_diff_stats("same\n", "same\n"), (0, 0));
    }
}
