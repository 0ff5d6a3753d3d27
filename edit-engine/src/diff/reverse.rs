//! Diff reversal.
//!
//! Reversing swaps the `---`/`+++` headers, inverts every line tag, and swaps
//! the count pairs in each hunk header. The output is re-rendered in
//! canonical form (deletions before additions within a mixed run), which
//! makes reversal an involution on generated diffs.

use super::{canonical_path, parse_multi_file_diff, DiffHunk, FileDiff, HunkLine, LineKind, DEV_NULL};

/// Options for [`reverse_diff`].
#[derive(Debug, Clone, Default)]
pub struct ReverseOptions {
    /// Only reverse these canonical workspace-relative paths.
    pub include_files: Option<Vec<String>>,
    /// Skip these canonical workspace-relative paths.
    pub exclude_files: Option<Vec<String>>,
    /// Report files whose hunks overlap (a reversed apply would be
    /// ambiguous for them).
    pub check_conflicts: bool,
}

/// Outcome of [`reverse_diff`].
#[derive(Debug, Clone)]
pub struct ReverseResult {
    pub success: bool,
    pub reversed_diff: String,
    pub affected_files: Vec<String>,
    pub conflicts: Option<Vec<String>>,
    pub message: Option<String>,
}

/// Reverse a (possibly multi-file) unified diff.
///
/// The reversed diff, applied to the post-state of the original, restores
/// the pre-state. File creations become deletions and vice versa.
pub fn reverse_diff(text: &str, opts: &ReverseOptions) -> ReverseResult {
    let files = parse_multi_file_diff(text);

    let kept: Vec<&FileDiff> = files
        .iter()
        .filter(|fd| {
            let Some(path) = fd.target_path() else {
                return false;
            };
            if let Some(include) = &opts.include_files {
                if !include.iter().any(|p| p == &path) {
                    return false;
                }
            }
            if let Some(exclude) = &opts.exclude_files {
                if exclude.iter().any(|p| p == &path) {
                    return false;
                }
            }
            true
        })
        .collect();

    let mut conflicts = Vec::new();
    if opts.check_conflicts {
        for fd in &kept {
            if has_overlapping_hunks(fd) {
                if let Some(path) = fd.target_path() {
                    conflicts.push(path);
                }
            }
        }
        let mut seen = std::collections::HashSet::new();
        for fd in &kept {
            if let Some(path) = fd.target_path() {
                if !seen.insert(path.clone()) && !conflicts.contains(&path) {
                    conflicts.push(path);
                }
            }
        }
    }

    let affected_files: Vec<String> = kept.iter().filter_map(|fd| fd.target_path()).collect();
    let reversed_diff: String = kept.iter().map(|fd| reverse_file_diff(fd)).collect();

    if !conflicts.is_empty() {
        return ReverseResult {
            success: false,
            reversed_diff,
            affected_files,
            conflicts: Some(conflicts.clone()),
            message: Some(format!(
                "conflicting hunks detected in: {}",
                conflicts.join(", ")
            )),
        };
    }

    ReverseResult {
        success: true,
        reversed_diff,
        affected_files,
        conflicts: None,
        message: None,
    }
}

fn reverse_file_diff(fd: &FileDiff) -> String {
    let mut out = String::with_capacity(fd.raw.len());
    out.push_str(&format!("--- {}\n", swap_side(&fd.new_path, "a/")));
    out.push_str(&format!("+++ {}\n", swap_side(&fd.old_path, "b/")));
    for hunk in &fd.hunks {
        out.push_str(&reverse_hunk(hunk));
    }
    out
}

/// Re-label a side for its new role: `b/P` ↔ `a/P`, `/dev/null` unchanged.
fn swap_side(label: &str, target_prefix: &str) -> String {
    if label == DEV_NULL {
        return label.to_string();
    }
    match canonical_path(label) {
        Some(path) => format!("{target_prefix}{path}"),
        None => label.to_string(),
    }
}

fn reverse_hunk(hunk: &DiffHunk) -> String {
    let mut out = format!(
        "@@ -{},{} +{},{} @@\n",
        hunk.new_start, hunk.new_count, hunk.old_start, hunk.old_count
    );

    // Invert tags, then restore canonical ordering (deletions before
    // additions) inside each run of non-context lines.
    let mut run: Vec<HunkLine> = Vec::new();
    let flush_run = |run: &mut Vec<HunkLine>, out: &mut String| {
        for line in run.iter().filter(|l| l.kind == LineKind::Deletion) {
            push_line(out, line);
        }
        for line in run.iter().filter(|l| l.kind == LineKind::Addition) {
            push_line(out, line);
        }
        run.clear();
    };

    for line in &hunk.lines {
        match line.kind {
            LineKind::Context => {
                flush_run(&mut run, &mut out);
                push_line(&mut out, line);
            }
            LineKind::Addition => run.push(HunkLine {
                kind: LineKind::Deletion,
                text: line.text.clone(),
                no_newline: line.no_newline,
            }),
            LineKind::Deletion => run.push(HunkLine {
                kind: LineKind::Addition,
                text: line.text.clone(),
                no_newline: line.no_newline,
            }),
        }
    }
    flush_run(&mut run, &mut out);
    out
}

fn push_line(out: &mut String, line: &HunkLine) {
    let prefix = match line.kind {
        LineKind::Context => ' ',
        LineKind::Addition => '+',
        LineKind::Deletion => '-',
    };
    out.push(prefix);
    out.push_str(&line.text);
    out.push('\n');
    if line.no_newline {
        out.push_str("\\ No newline at end of file\n");
    }
}

/// Hunks are expected in ascending, non-overlapping old-side order.
fn has_overlapping_hunks(fd: &FileDiff) -> bool {
    let mut prev_end = 0usize;
    for hunk in &fd.hunks {
        let start = hunk.old_start;
        if start < prev_end {
            return true;
        }
        prev_end = start + hunk.old_count;
    }
    false
}
