//! Strict structural validation of the unified diff dialect.

use regex::Regex;
use std::sync::OnceLock;

/// Outcome of [`validate_diff_format`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

fn hunk_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^@@ -\d+(?:,\d+)? \+\d+(?:,\d+)? @@").expect("static regex")
    })
}

/// Check `text` against the engine's diff dialect.
///
/// Violations reported: missing trailing newline, carriage returns, a `---`
/// header without a following `+++`, malformed hunk headers, and hunk bodies
/// whose counted lines disagree with the declared counts. The
/// `\ No newline at end of file` sentinel is accepted and never counted.
pub fn validate_diff_format(text: &str) -> DiffValidation {
    let mut errors = Vec::new();

    if text.is_empty() {
        return DiffValidation {
            is_valid: false,
            errors: vec!["diff is empty".into()],
        };
    }
    if !text.ends_with('\n') {
        errors.push("diff must end with a newline".into());
    }
    if let Some(pos) = text.find('\r') {
        let line = text[..pos].matches('\n').count() + 1;
        errors.push(format!(
            "carriage return character at line {line}; only LF line endings are allowed"
        ));
    }

    let lines: Vec<&str> = text.lines().collect();
    let mut expecting_plus: Option<usize> = None;
    let mut hunk: Option<HunkCount> = None;

    for (idx, line) in lines.iter().enumerate() {
        let n = idx + 1;

        if line.starts_with("diff --git ") || line.starts_with("index ") {
            continue;
        }

        if let Some(header_line) = expecting_plus.take() {
            if !line.starts_with("+++ ") {
                errors.push(format!(
                    "line {header_line}: '---' header is not followed by a '+++' header"
                ));
                // fall through and interpret the current line normally
            } else {
                continue;
            }
        }

        // Outside a hunk body every `--- ` line is a file header and must be
        // followed by `+++`. Inside a hunk it may be a deletion line whose
        // text starts with `-- `, so the `+++` lookahead disambiguates.
        if line.starts_with("--- ") && (hunk.is_none() || is_header_position(&lines, idx)) {
            flush_hunk(&mut hunk, &mut errors);
            expecting_plus = Some(n);
            continue;
        }

        if line.starts_with("@@") {
            flush_hunk(&mut hunk, &mut errors);
            match super::parse::parse_hunk_header(line) {
                Some((_, old_count, _, new_count)) if hunk_header_re().is_match(line) => {
                    hunk = Some(HunkCount {
                        header_line: n,
                        declared_old: old_count,
                        declared_new: new_count,
                        seen_old: 0,
                        seen_new: 0,
                    });
                }
                _ => errors.push(format!("line {n}: malformed hunk header `{line}`")),
            }
            continue;
        }

        if let Some(h) = hunk.as_mut() {
            if line.starts_with('\\') {
                continue;
            }
            match line.chars().next() {
                Some('+') => h.seen_new += 1,
                Some('-') => h.seen_old += 1,
                Some(' ') | None => {
                    h.seen_old += 1;
                    h.seen_new += 1;
                }
                Some(_) => errors.push(format!(
                    "line {n}: hunk line must start with ' ', '+', '-' or '\\'"
                )),
            }
        }
    }

    if let Some(header_line) = expecting_plus {
        errors.push(format!(
            "line {header_line}: '---' header is not followed by a '+++' header"
        ));
    }
    flush_hunk(&mut hunk, &mut errors);

    DiffValidation {
        is_valid: errors.is_empty(),
        errors,
    }
}

struct HunkCount {
    header_line: usize,
    declared_old: usize,
    declared_new: usize,
    seen_old: usize,
    seen_new: usize,
}

fn flush_hunk(hunk: &mut Option<HunkCount>, errors: &mut Vec<String>) {
    let Some(h) = hunk.take() else { return };
    if h.seen_old != h.declared_old {
        errors.push(format!(
            "hunk at line {}: old side declares {} lines but {} were counted",
            h.header_line, h.declared_old, h.seen_old
        ));
    }
    if h.seen_new != h.declared_new {
        errors.push(format!(
            "hunk at line {}: new side declares {} lines but {} were counted",
            h.header_line, h.declared_new, h.seen_new
        ));
    }
}

/// Same lookahead rule as the parser: `---` is a header only when `+++`
/// follows.
fn is_header_position(lines: &[&str], i: usize) -> bool {
    let mut j = i + 1;
    while j < lines.len()
        && (lines[j].starts_with("diff --git ") || lines[j].starts_with("index "))
    {
        j += 1;
    }
    j < lines.len() && lines[j].starts_with("+++ ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{generate_unified_diff, DiffOptions};

    #[test]
    fn generated_diffs_validate() {
        let diff = generate_unified_diff(
            "a\nb\nc\n",
            "a\nB\nc\n",
            &DiffOptions::new("f.txt", "f.txt"),
        );
        let v = validate_diff_format(&diff);
        assert!(v.is_valid, "errors: {:?}", v.errors);
    }

    #[test]
    fn missing_trailing_newline_is_reported() {
        let v = validate_diff_format("--- a/f\n+++ b/f\n@@ -1,1 +1,1 @@\n-x\n+y");
        assert!(!v.is_valid);
        assert!(v.errors.iter().any(|e| e.contains("end with a newline")));
    }

    #[test]
    fn carriage_returns_are_rejected() {
        let v = validate_diff_format("--- a/f\r\n+++ b/f\n@@ -1,1 +1,1 @@\n-x\n+y\n");
        assert!(!v.is_valid);
        assert!(v.errors.iter().any(|e| e.contains("carriage return")));
    }

    #[test]
    fn missing_plus_header_is_reported() {
        let v = validate_diff_format("--- a/f\n@@ -1,1 +1,1 @@\n-x\n+y\n");
        assert!(!v.is_valid);
        assert!(v.errors.iter().any(|e| e.contains("'+++'")));
    }

    #[test]
    fn malformed_hunk_header_is_reported() {
        let v = validate_diff_format("--- a/f\n+++ b/f\n@@ -1;1 +1,1 @@\n-x\n+y\n");
        assert!(!v.is_valid);
        assert!(v.errors.iter().any(|e| e.contains("malformed hunk header")));
    }

    #[test]
    fn line_count_mismatch_is_reported() {
        let v = validate_diff_format("--- a/f\n+++ b/f\n@@ -1,2 +1,1 @@\n-x\n+y\n");
        assert!(!v.is_valid);
        assert!(v
            .errors
            .iter()
            .any(|e| e.contains("old side declares 2 lines but 1 were counted")));
    }

    #[test]
    fn no_newline_sentinel_is_not_counted() {
        let v = validate_diff_format(
            "--- a/f\n+++ b/f\n@@ -1,1 +1,1 @@\n-x\n+y\n\\ No newline at end of file\n",
        );
        assert!(v.is_valid, "errors: {:?}", v.errors);
    }

    #[test]
    fn empty_diff_is_invalid() {
        assert!(!validate_diff_format("").is_valid);
    }

    #[test]
    fn blank_context_line_counts_for_both_sides() {
        let v = validate_diff_format("--- a/f\n+++ b/f\n@@ -1,3 +1,3 @@\n a\n\n-b\n+B\n");
        // blank line (stripped space) is context for both sides
        assert!(v.is_valid, "errors: {:?}", v.errors);
    }
}
