//! Unified diffs for file change previews.
//!
//! [`unified_diff`] compares old and new content; [`new_file_preview`] shows
//! a file that does not exist yet as all additions. Output is plain text so
//! it can sit inside a fenced `diff` block of a confirmation prompt.

use similar::{ChangeTag, TextDiff};

/// Generate a unified diff with three lines of context.
///
/// Returns only the headers if the contents are identical.
pub fn unified_diff(old: &str, new: &str, path: &str) -> String {
    let diff = TextDiff::from_lines(old, new);
    let mut output = String::new();

    output.push_str(&format!("--- a/{}\n", path));
    output.push_str(&format!("+++ b/{}\n", path));

    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        output.push_str(&format!("{}\n", hunk.header()));

        for change in hunk.iter_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => '-',
                ChangeTag::Insert => '+',
                ChangeTag::Equal => ' ',
            };
            output.push(sign);
            output.push_str(change.value());
            if change.missing_newline() {
                output.push('\n');
            }
        }
    }

    output
}

/// Preview for a new file: every line is an addition.
pub fn new_file_preview(content: &str, path: &str) -> String {
    let mut output = String::new();
    output.push_str("--- /dev/null\n");
    output.push_str(&format!("+++ b/{}\n", path));

    for line in content.lines() {
        output.push_str(&format!("+{}\n", line));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unified_diff_marks_changes() {
        let diff = unified_diff("a\nb\nc\n", "a\nB\nc\n", "x.txt");
        assert!(diff.starts_with("--- a/x.txt\n+++ b/x.txt\n"));
        assert!(diff.contains("-b\n"));
        assert!(diff.contains("+B\n"));
        assert!(diff.contains(" a\n"));
    }

    #[test]
    fn test_identical_content_has_no_hunks() {
        let diff = unified_diff("same\n", "same\n", "x.txt");
        assert_eq!(diff, "--- a/x.txt\n+++ b/x.txt\n");
    }

    #[test]
    fn test_missing_trailing_newline_is_terminated() {
        let diff = unified_diff("a", "b", "x.txt");
        assert!(diff.ends_with("+b\n"));
    }

    #[test]
    fn test_new_file_preview() {
        let preview = new_file_preview("one\ntwo", "new.txt");
        assert_eq!(preview, "--- /dev/null\n+++ b/new.txt\n+one\n+two\n");
    }
}
