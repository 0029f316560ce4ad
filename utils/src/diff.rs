//! Unified line diff rendering.

use std::fmt::Write as _;

use similar::{ChangeTag, TextDiff};

/// Format a line diff from `expected` to `actual`.
///
/// Produces output with:
/// - 1 line of context around each change
/// - `...` between changes separated by >3 unchanged lines
/// - `-` for lines only in `expected`, `+` for lines only in `actual`
///
/// Returns an empty string when both texts are identical.
#[must_use]
pub fn format_unified_diff(expected: &str, actual: &str) -> String {
    let diff = TextDiff::from_lines(expected, actual);
    let changes: Vec<_> = diff.iter_all_changes().collect();
    if changes.iter().all(|c| c.tag() == ChangeTag::Equal) {
        return String::new();
    }

    let max_line = expected.lines().count().max(actual.lines().count()).max(1);
    let width = max_line.to_string().len();
    let gap_marker = format!("{:>width$}\n", "...");

    let mut out = String::new();
    let mut last_output_idx: Option<usize> = None;

    for (i, change) in changes.iter().enumerate() {
        let (sign, line_no) = match change.tag() {
            ChangeTag::Equal => {
                let near_prev = i > 0 && changes[i - 1].tag() != ChangeTag::Equal;
                let near_next = changes
                    .get(i + 1)
                    .is_some_and(|c| c.tag() != ChangeTag::Equal);
                if !(near_prev || near_next) {
                    continue;
                }
                (' ', change.old_index())
            }
            ChangeTag::Delete => ('-', change.old_index()),
            ChangeTag::Insert => ('+', change.new_index()),
        };

        if let Some(last_idx) = last_output_idx
            && i - last_idx - 1 > 3
        {
            out.push_str(&gap_marker);
        }
        let line_no = line_no.map_or(0, |n| n + 1);
        let _ = write!(out, "{line_no:>width$} {sign}");
        out.push_str(change.value().trim_end_matches('\n'));
        out.push('\n');
        last_output_idx = Some(i);
    }

    out
}
