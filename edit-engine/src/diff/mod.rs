//! Unified diff engine.
//!
//! Pure text transformation, no I/O: generation, multi-file parsing,
//! validation, reversal, and patch-output analysis for the strict unified
//! diff dialect used across the engine (LF-only, git-style headers, `a/` /
//! `b/` path prefixes, `/dev/null` for absent sides).

mod analyze;
mod generate;
mod hash;
mod parse;
mod reverse;
mod validate;

pub use analyze::{analyze_patch_result, PatchOutcome};
pub use generate::{generate_unified_diff, DiffOptions, GitHeaderOptions};
pub use hash::{add_file_hashes_to_diff, calculate_file_hash, get_git_timestamp};
pub use parse::parse_multi_file_diff;
pub use reverse::{reverse_diff, ReverseOptions, ReverseResult};
pub use validate::{validate_diff_format, DiffValidation};

/// Marker for an absent file side in diff headers.
pub const DEV_NULL: &str = "/dev/null";

/// Tag of a single line inside a hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Context,
    Addition,
    Deletion,
}

/// One line of a hunk, prefix and terminator stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkLine {
    pub kind: LineKind,
    pub text: String,
    /// Followed by the `\ No newline at end of file` sentinel.
    pub no_newline: bool,
}

/// A single `@@ -A,B +C,D @@` hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<HunkLine>,
}

/// One file's worth of a multi-file unified diff.
#[derive(Debug, Clone)]
pub struct FileDiff {
    /// Header label of the old side (`a/P` or `/dev/null`), timestamp stripped.
    pub old_path: String,
    /// Header label of the new side (`b/P` or `/dev/null`), timestamp stripped.
    pub new_path: String,
    pub hunks: Vec<DiffHunk>,
    /// The verbatim per-file text (headers + hunks), always newline-terminated.
    pub raw: String,
}

impl FileDiff {
    /// Whether this diff creates the file.
    ///
    /// True when the old side is `/dev/null`, or when the single hunk covers
    /// zero old lines (`@@ -0,0 …` / `@@ -1,0 …` conventions).
    pub fn is_creation(&self) -> bool {
        is_file_creation(&self.old_path)
            || (self.hunks.len() == 1
                && self.hunks[0].old_count == 0
                && self.hunks[0].old_start <= 1)
    }

    /// Whether this diff deletes the file.
    pub fn is_deletion(&self) -> bool {
        is_file_deletion(&self.new_path)
            || (self.hunks.len() == 1
                && self.hunks[0].new_count == 0
                && self.hunks[0].new_start <= 1)
    }

    /// The canonical workspace-relative path this diff applies to: the new
    /// side unless the file is being deleted.
    pub fn target_path(&self) -> Option<String> {
        canonical_path(&self.new_path).or_else(|| canonical_path(&self.old_path))
    }
}

/// True iff an old-side header label denotes an absent file.
pub fn is_file_creation(old_path: &str) -> bool {
    old_path.trim() == DEV_NULL
}

/// True iff a new-side header label denotes an absent file.
pub fn is_file_deletion(new_path: &str) -> bool {
    new_path.trim() == DEV_NULL
}

/// Strip the `a/` / `b/` prefix and any trailing timestamp from a header
/// label. Returns `None` for `/dev/null`.
pub fn canonical_path(label: &str) -> Option<String> {
    let label = label.split('\t').next().unwrap_or(label).trim();
    if label == DEV_NULL {
        return None;
    }
    let stripped = label
        .strip_prefix("a/")
        .or_else(|| label.strip_prefix("b/"))
        .unwrap_or(label);
    Some(stripped.to_string())
}

/// Extract the canonical target path from the first file diff in `text`.
pub fn extract_file_path_from_diff(text: &str) -> Option<String> {
    let mut old_label = None;
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("+++ ") {
            if let Some(p) = canonical_path(rest) {
                return Some(p);
            }
        } else if let Some(rest) = line.strip_prefix("--- ") {
            if old_label.is_none() {
                old_label = canonical_path(rest);
            }
        }
    }
    old_label
}

/// Count the changed lines (`+` / `-`, headers excluded) across the diff.
pub fn count_diff_changes(text: &str) -> usize {
    text.lines()
        .filter(|l| {
            (l.starts_with('+') && !l.starts_with("+++"))
                || (l.starts_with('-') && !l.starts_with("---"))
        })
        .count()
}

/// Append a trailing newline if the (non-empty) diff lacks one.
pub fn ensure_diff_line_ending(text: &str) -> String {
    if text.is_empty() || text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{text}\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_path_strips_prefix_and_timestamp() {
        assert_eq!(canonical_path("a/src/main.rs"), Some("src/main.rs".into()));
        assert_eq!(canonical_path("b/lib.rs\t1722470400 +0000"), Some("lib.rs".into()));
        assert_eq!(canonical_path("/dev/null"), None);
        assert_eq!(canonical_path("plain.txt"), Some("plain.txt".into()));
    }

    #[test]
    fn creation_and_deletion_markers() {
        assert!(is_file_creation("/dev/null"));
        assert!(!is_file_creation("a/x.txt"));
        assert!(is_file_deletion("/dev/null"));
    }

    #[test]
    fn extract_path_prefers_new_side() {
        let diff = "--- a/old.txt\n+++ b/new.txt\n@@ -1,1 +1,1 @@\n-x\n+y\n";
        assert_eq!(extract_file_path_from_diff(diff), Some("new.txt".into()));
    }

    #[test]
    fn extract_path_falls_back_to_old_side_on_deletion() {
        let diff = "--- a/gone.txt\n+++ /dev/null\n@@ -1,1 +1,0 @@\n-x\n";
        assert_eq!(extract_file_path_from_diff(diff), Some("gone.txt".into()));
    }

    #[test]
    fn count_changes_excludes_headers() {
        let diff = "--- a/f\n+++ b/f\n@@ -1,2 +1,2 @@\n context\n-old\n+new\n";
        assert_eq!(count_diff_changes(diff), 2);
    }

    #[test]
    fn ensure_line_ending_appends_once() {
        assert_eq!(ensure_diff_line_ending("abc"), "abc\n");
        assert_eq!(ensure_diff_line_ending("abc\n"), "abc\n");
        assert_eq!(ensure_diff_line_ending(""), "");
    }
}
