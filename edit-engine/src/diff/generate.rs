//! Unified diff generation on top of `similar`'s line diff.
//!
//! The textual output is kept under our own control rather than delegating to
//! `similar`'s writer: hunk headers, `a/`/`b/` labels, git preamble lines and
//! no-newline sentinels must match the engine's dialect exactly.

use similar::{ChangeTag, TextDiff};

use super::hash::{calculate_file_hash, get_git_timestamp};
use super::DEV_NULL;

/// Optional git-style preamble and header decoration.
#[derive(Debug, Clone, Default)]
pub struct GitHeaderOptions {
    /// Emit `diff --git a/P b/P` and `index OLD..NEW 100644` lines.
    pub include_hash: bool,
    /// Append `\tSECONDS ±HHMM` to the `---` / `+++` headers.
    pub use_git_timestamp: bool,
    /// Override for the old-side short hash (7 hex chars).
    pub old_hash: Option<String>,
    /// Override for the new-side short hash (7 hex chars).
    pub new_hash: Option<String>,
}

/// Options for [`generate_unified_diff`].
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Workspace-relative old path, or `/dev/null` for a created file.
    pub old_path: String,
    /// Workspace-relative new path, or `/dev/null` for a deleted file.
    pub new_path: String,
    /// Context radius around changes.
    pub context_lines: usize,
    pub git: Option<GitHeaderOptions>,
}

impl DiffOptions {
    pub fn new(old_path: impl Into<String>, new_path: impl Into<String>) -> Self {
        Self {
            old_path: old_path.into(),
            new_path: new_path.into(),
            context_lines: 3,
            git: None,
        }
    }

    pub fn with_context(mut self, context_lines: usize) -> Self {
        self.context_lines = context_lines;
        self
    }

    pub fn with_git(mut self, git: GitHeaderOptions) -> Self {
        self.git = Some(git);
        self
    }
}

/// Produce a canonical unified diff between `old` and `new`.
///
/// Equal inputs yield the empty string; everything else ends with exactly
/// one trailing newline. An empty old side produces a creation hunk
/// (`@@ -1,0 +1,N @@`), an empty new side a deletion hunk.
pub fn generate_unified_diff(old: &str, new: &str, opts: &DiffOptions) -> String {
    if old == new {
        return String::new();
    }

    let diff = TextDiff::from_lines(old, new);
    let groups = diff.grouped_ops(opts.context_lines);
    if groups.is_empty() {
        return String::new();
    }

    let old_label = side_label(&opts.old_path, "a/");
    let new_label = side_label(&opts.new_path, "b/");

    let mut out = String::with_capacity(old.len() / 2 + new.len() / 2 + 128);

    if let Some(git) = &opts.git {
        if git.include_hash {
            let display = display_path(&opts.new_path, &opts.old_path);
            out.push_str(&format!("diff --git a/{display} b/{display}\n"));
            let old_hash = git
                .old_hash
                .clone()
                .unwrap_or_else(|| calculate_file_hash(old));
            let new_hash = git
                .new_hash
                .clone()
                .unwrap_or_else(|| calculate_file_hash(new));
            out.push_str(&format!("index {old_hash}..{new_hash} 100644\n"));
        }
    }

    let timestamp = opts
        .git
        .as_ref()
        .filter(|g| g.use_git_timestamp)
        .map(|_| get_git_timestamp());
    match &timestamp {
        Some(ts) => {
            out.push_str(&format!("--- {old_label}\t{ts}\n"));
            out.push_str(&format!("+++ {new_label}\t{ts}\n"));
        }
        None => {
            out.push_str(&format!("--- {old_label}\n"));
            out.push_str(&format!("+++ {new_label}\n"));
        }
    }

    for group in &groups {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let old_start = first.old_range().start;
        let old_count = last.old_range().end - old_start;
        let new_start = first.new_range().start;
        let new_count = last.new_range().end - new_start;
        out.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            old_start + 1,
            old_count,
            new_start + 1,
            new_count
        ));

        for op in group {
            for change in diff.iter_changes(op) {
                let prefix = match change.tag() {
                    ChangeTag::Equal => ' ',
                    ChangeTag::Delete => '-',
                    ChangeTag::Insert => '+',
                };
                let value = change.value();
                let line = value.strip_suffix('\n').unwrap_or(value);
                out.push(prefix);
                out.push_str(line);
                out.push('\n');
                if !value.ends_with('\n') {
                    out.push_str("\\ No newline at end of file\n");
                }
            }
        }
    }

    out
}

fn side_label(path: &str, prefix: &str) -> String {
    if path == DEV_NULL {
        DEV_NULL.to_string()
    } else if path.starts_with("a/") || path.starts_with("b/") {
        path.to_string()
    } else {
        format!("{prefix}{path}")
    }
}

fn display_path<'a>(preferred: &'a str, fallback: &'a str) -> &'a str {
    let pick = if preferred == DEV_NULL { fallback } else { preferred };
    pick.strip_prefix("a/")
        .or_else(|| pick.strip_prefix("b/"))
        .unwrap_or(pick)
}
