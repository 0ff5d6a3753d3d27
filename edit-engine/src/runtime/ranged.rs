//! Line-range editing.

use tracing::debug;

use super::{atomic_write, read_text_if_exists, EditResult, Runtime};
use crate::diff::{self, DiffOptions, DEV_NULL};
use crate::error::{EngineError, EngineResult};

impl Runtime {
    /// Replace the inclusive 1-indexed line range `start..=end` of `path`
    /// with `content`.
    ///
    /// `start = end = -1` appends. `end = -1` alone means end-of-file.
    /// A `start` past the current length pads the file with empty lines.
    /// Missing files (and parent directories) are created.
    pub fn apply_ranged_edit(
        &self,
        path: &str,
        content: &str,
        start: i64,
        end: i64,
    ) -> EngineResult<EditResult> {
        if start != -1 && start < 1 {
            return Err(EngineError::InvalidRange {
                start,
                end,
                reason: "start must be 1-indexed or -1".into(),
            });
        }
        if start == -1 && end != -1 {
            return Err(EngineError::InvalidRange {
                start,
                end,
                reason: "start = -1 requires end = -1 (append)".into(),
            });
        }
        if start != -1 && end != -1 && end < start {
            return Err(EngineError::InvalidRange {
                start,
                end,
                reason: "end precedes start".into(),
            });
        }

        let (abs, rel) = self.workspace.resolve_pair(path)?;
        debug!(path = %rel, start, end, "ranged edit");

        let pre = read_text_if_exists(&abs)?;
        let existed = pre.is_some();
        let pre_text = pre.unwrap_or_default();
        let mut lines: Vec<String> = pre_text.lines().map(str::to_string).collect();
        let new_lines: Vec<String> = content.lines().map(str::to_string).collect();

        if start == -1 {
            lines.extend(new_lines);
        } else {
            let start0 = (start - 1) as usize;
            if start0 > lines.len() {
                // Pad the gap with empty lines.
                lines.resize(start0, String::new());
            }
            let end0 = if end == -1 {
                lines.len()
            } else {
                (end as usize).min(lines.len())
            };
            let end0 = end0.max(start0);
            lines.splice(start0..end0, new_lines);
        }

        let mut updated = lines.join("\n");
        if !updated.is_empty() {
            updated.push('\n');
        }
        atomic_write(&abs, &updated)?;

        let old_label = if existed { rel.clone() } else { DEV_NULL.to_string() };
        let diff = diff::generate_unified_diff(
            &pre_text,
            &updated,
            &DiffOptions::new(old_label, rel.clone())
                .with_context(self.config.context_lines),
        );
        let message = if start == -1 {
            format!("Appended {} lines to {rel}", content.lines().count())
        } else {
            format!("Replaced lines {start}..{end} of {rel}")
        };
        Ok(EditResult::ok(message).with_diff(diff).with_files(vec![rel]))
    }
}
