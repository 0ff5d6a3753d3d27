//! Multi-file unified diff parsing.
//!
//! Parsing is deliberately lenient — strict checking lives in
//! [`validate_diff_format`](super::validate_diff_format). A `--- ` line only
//! starts a new file when a `+++ ` header follows it, so deletion lines whose
//! text begins with `-- ` are not mistaken for file boundaries.

use super::{DiffHunk, FileDiff, HunkLine, LineKind};

/// Split a (possibly multi-file) unified diff into per-file diffs.
///
/// `diff --git` and `index` preamble lines are stripped from the per-file
/// content. Returns an empty vector iff `text` contains no `--- ` file
/// header. Every returned file diff's `raw` ends with a newline.
pub fn parse_multi_file_diff(text: &str) -> Vec<FileDiff> {
    let lines: Vec<&str> = text.lines().collect();
    let mut files = Vec::new();
    let mut current: Option<Builder> = None;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if is_preamble(line) {
            i += 1;
            continue;
        }
        if line.starts_with("--- ") && is_file_header(&lines, i) {
            if let Some(b) = current.take() {
                files.push(b.finish());
            }
            let mut j = i + 1;
            while j < lines.len() && is_preamble(lines[j]) {
                j += 1;
            }
            let mut b = Builder::new(header_label(&line[4..]), header_label(&lines[j][4..]));
            b.raw.push_str(line);
            b.raw.push('\n');
            b.raw.push_str(lines[j]);
            b.raw.push('\n');
            current = Some(b);
            i = j + 1;
            continue;
        }
        if let Some(b) = current.as_mut() {
            b.push_line(line);
        }
        i += 1;
    }
    if let Some(b) = current.take() {
        files.push(b.finish());
    }
    files
}

fn is_preamble(line: &str) -> bool {
    line.starts_with("diff --git ") || line.starts_with("index ")
}

/// A `--- ` line is a file header only when the next non-preamble line is a
/// `+++ ` header.
fn is_file_header(lines: &[&str], i: usize) -> bool {
    let mut j = i + 1;
    while j < lines.len() && is_preamble(lines[j]) {
        j += 1;
    }
    j < lines.len() && lines[j].starts_with("+++ ")
}

/// Header payload with any tab-separated timestamp removed.
fn header_label(rest: &str) -> String {
    rest.split('\t').next().unwrap_or(rest).trim_end().to_string()
}

struct Builder {
    old_path: String,
    new_path: String,
    hunks: Vec<DiffHunk>,
    hunk: Option<DiffHunk>,
    raw: String,
}

impl Builder {
    fn new(old_path: String, new_path: String) -> Self {
        Self {
            old_path,
            new_path,
            hunks: Vec::new(),
            hunk: None,
            raw: String::new(),
        }
    }

    fn push_line(&mut self, line: &str) {
        self.raw.push_str(line);
        self.raw.push('\n');

        if line.starts_with("@@") {
            self.flush_hunk();
            if let Some((old_start, old_count, new_start, new_count)) = parse_hunk_header(line) {
                self.hunk = Some(DiffHunk {
                    old_start,
                    old_count,
                    new_start,
                    new_count,
                    lines: Vec::new(),
                });
            }
            return;
        }

        let Some(hunk) = self.hunk.as_mut() else {
            return;
        };

        if let Some(rest) = line.strip_prefix('\\') {
            // `\ No newline at end of file` attaches to the previous line.
            let _ = rest;
            if let Some(last) = hunk.lines.last_mut() {
                last.no_newline = true;
            }
            return;
        }

        let (kind, text) = if let Some(rest) = line.strip_prefix('+') {
            (LineKind::Addition, rest)
        } else if let Some(rest) = line.strip_prefix('-') {
            (LineKind::Deletion, rest)
        } else if let Some(rest) = line.strip_prefix(' ') {
            (LineKind::Context, rest)
        } else if line.is_empty() {
            // Some emitters drop the single space on blank context lines.
            (LineKind::Context, "")
        } else {
            // Garbage between hunks; ends the current hunk.
            self.flush_hunk();
            return;
        };
        hunk.lines.push(HunkLine {
            kind,
            text: text.to_string(),
            no_newline: false,
        });
    }

    fn flush_hunk(&mut self) {
        if let Some(h) = self.hunk.take() {
            self.hunks.push(h);
        }
    }

    fn finish(mut self) -> FileDiff {
        self.flush_hunk();
        if !self.raw.ends_with('\n') {
            self.raw.push('\n');
        }
        FileDiff {
            old_path: self.old_path,
            new_path: self.new_path,
            hunks: self.hunks,
            raw: self.raw,
        }
    }
}

/// Parse `@@ -A[,B] +C[,D] @@`, counts defaulting to 1.
pub(crate) fn parse_hunk_header(line: &str) -> Option<(usize, usize, usize, usize)> {
    let inner = line.strip_prefix("@@")?.split("@@").next()?.trim();
    let mut parts = inner.split_whitespace();
    let old = parts.next()?.strip_prefix('-')?;
    let new = parts.next()?.strip_prefix('+')?;
    let (old_start, old_count) = parse_range(old)?;
    let (new_start, new_count) = parse_range(new)?;
    Some((old_start, old_count, new_start, new_count))
}

fn parse_range(s: &str) -> Option<(usize, usize)> {
    match s.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((s.parse().ok()?, 1)),
    }
}
