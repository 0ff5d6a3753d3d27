//! Search/replace block editing.
//!
//! The search block is located by exact substring match first; with
//! `ignore_whitespace`, a whitespace-collapsed line-window match is attempted
//! instead. Only the first exact occurrence is replaced. The fuzzy match must
//! be unique — an ambiguous mapping fails rather than mis-aligning.

use tracing::{debug, warn};

use super::{atomic_write, read_text_if_exists, EditResult, Runtime};
use crate::diff::{self, DiffOptions, DEV_NULL};
use crate::error::{EngineError, EngineResult};

impl Runtime {
    /// Replace the first occurrence of `search` in `path` with `replace`.
    ///
    /// An empty `search` creates the file with `replace` as content when it
    /// does not exist, and is a validation error when it does.
    pub fn apply_edit_block(
        &self,
        path: &str,
        search: &str,
        replace: &str,
        ignore_whitespace: bool,
    ) -> EngineResult<EditResult> {
        let (abs, rel) = self.workspace.resolve_pair(path)?;
        debug!(path = %rel, ignore_whitespace, "edit block");

        let pre = read_text_if_exists(&abs)?;

        if search.is_empty() {
            return match pre {
                None => {
                    atomic_write(&abs, replace)?;
                    let diff = diff::generate_unified_diff(
                        "",
                        replace,
                        &DiffOptions::new(DEV_NULL, rel.clone())
                            .with_context(self.config.context_lines),
                    );
                    let mut result =
                        EditResult::ok(format!("Created {rel} from empty search block"))
                            .with_diff(diff)
                            .with_files(vec![rel]);
                    result.changes_applied = 1;
                    Ok(result)
                }
                Some(_) => Err(EngineError::EmptySearchBlock { path: rel }),
            };
        }

        let content = pre.ok_or(EngineError::FileNotFound { path: abs.clone() })?;

        let (start, end) = match content.find(search) {
            Some(pos) => (pos, pos + search.len()),
            None if ignore_whitespace => {
                warn!(path = %rel, "exact match failed, trying whitespace-collapsed match");
                fuzzy_find_unique(&content, search).ok_or_else(|| {
                    EngineError::SearchBlockNotFound {
                        path: rel.clone(),
                        detail: Some(
                            "no unique whitespace-collapsed match for the search block".into(),
                        ),
                    }
                })?
            }
            None => {
                return Err(EngineError::SearchBlockNotFound {
                    path: rel,
                    detail: None,
                })
            }
        };

        let mut updated = String::with_capacity(content.len() - (end - start) + replace.len());
        updated.push_str(&content[..start]);
        updated.push_str(replace);
        updated.push_str(&content[end..]);

        atomic_write(&abs, &updated)?;

        let diff = diff::generate_unified_diff(
            &content,
            &updated,
            &DiffOptions::new(rel.clone(), rel.clone())
                .with_context(self.config.context_lines),
        );
        let mut result = EditResult::ok(format!(
            "Replaced {} lines with {} lines in {rel}",
            search.lines().count(),
            replace.lines().count()
        ))
        .with_diff(diff)
        .with_files(vec![rel]);
        // One block was replaced, however many lines it spans.
        result.changes_applied = 1;
        Ok(result)
    }
}

/// Collapse runs of whitespace within each line to a single space.
fn collapse_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Locate `needle` in `haystack` comparing whitespace-collapsed lines.
///
/// Returns the byte span of the matched region in the original text when the
/// match is unique, `None` when there is no match or more than one.
fn fuzzy_find_unique(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    let needle_lines: Vec<String> = needle.lines().map(collapse_whitespace).collect();
    if needle_lines.is_empty() {
        return None;
    }

    let hay_lines: Vec<&str> = haystack.lines().collect();
    if hay_lines.len() < needle_lines.len() {
        return None;
    }
    let collapsed: Vec<String> = hay_lines.iter().map(|l| collapse_whitespace(l)).collect();

    let mut matches = Vec::new();
    for i in 0..=collapsed.len() - needle_lines.len() {
        if collapsed[i..i + needle_lines.len()]
            .iter()
            .zip(needle_lines.iter())
            .all(|(a, b)| a == b)
        {
            matches.push(i);
        }
    }
    if matches.len() != 1 {
        return None;
    }

    let start_line = matches[0];
    let end_line = start_line + needle_lines.len();
    line_span_to_bytes(haystack, start_line, end_line)
}

/// Convert a `[start_line, end_line)` window into byte offsets. The end
/// offset excludes the trailing newline of the last matched line so that
/// replacements never eat the line terminator.
fn line_span_to_bytes(text: &str, start_line: usize, end_line: usize) -> Option<(usize, usize)> {
    let mut offset = 0;
    let mut start_byte = None;
    for (idx, line) in text.split_inclusive('\n').enumerate() {
        if idx == start_line {
            start_byte = Some(offset);
        }
        if idx + 1 == end_line {
            let line_body = line.strip_suffix('\n').unwrap_or(line);
            return Some((start_byte?, offset + line_body.len()));
        }
        offset += line.len();
    }
    None
}
