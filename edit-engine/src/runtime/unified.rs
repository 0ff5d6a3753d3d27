//! Unified diff application.
//!
//! The internal hunk-by-hunk applier is the default. When
//! `prefer_external_patch` is set the external `patch` utility is tried
//! first through the [`ProcessRunner`](crate::process::ProcessRunner) seam;
//! if the tool is missing the engine falls back to the internal routine.

use std::time::Duration;

use tracing::{debug, warn};

use super::{atomic_write, read_text_if_exists, ApplyOptions, EditResult, FileApplyResult, Runtime};
use crate::diff::{
    self, analyze_patch_result, count_diff_changes, ensure_diff_line_ending,
    parse_multi_file_diff, reverse_diff, validate_diff_format, FileDiff, LineKind, ReverseOptions,
};
use crate::error::{EngineError, EngineResult};

impl Runtime {
    /// Apply a (possibly multi-file) unified diff inside the workspace.
    ///
    /// Per-file results are reported individually; the overall result is
    /// successful iff every file applied. With `dry_run` nothing is written.
    pub async fn apply_unified_diff(
        &self,
        diff_text: &str,
        opts: &ApplyOptions,
    ) -> EngineResult<EditResult> {
        let diff_text = ensure_diff_line_ending(diff_text);
        let validation = validate_diff_format(&diff_text);
        if !validation.is_valid {
            return Err(EngineError::InvalidDiffFormat(validation.errors.join("; ")));
        }
        let files = parse_multi_file_diff(&diff_text);
        if files.is_empty() {
            return Err(EngineError::InvalidDiffFormat(
                "diff contains no file headers".into(),
            ));
        }

        if let Some(save_path) = &opts.save_diff_path {
            let (abs, rel) = self.workspace.resolve_pair(save_path)?;
            debug!(path = %rel, "saving incoming diff");
            atomic_write(&abs, &diff_text)?;
        }

        if self.config.prefer_external_patch {
            match self.apply_with_patch_tool(&diff_text, opts).await {
                Ok(result) => return Ok(result),
                Err(EngineError::PatchToolUnavailable { tool }) => {
                    warn!(%tool, "patch tool unavailable, falling back to internal applier");
                }
                Err(other) => return Err(other),
            }
        }

        self.apply_internally(&diff_text, &files, opts)
    }

    /// Reverse `diff_text`, then apply the reversed diff.
    pub async fn reverse_apply_unified_diff(
        &self,
        diff_text: &str,
        reverse_opts: &ReverseOptions,
        apply_opts: &ApplyOptions,
    ) -> EngineResult<EditResult> {
        let reversed = reverse_diff(diff_text, reverse_opts);
        if !reversed.success {
            let mut result = EditResult::failure(
                reversed
                    .message
                    .unwrap_or_else(|| "diff could not be reversed".into()),
            );
            result.affected_files = reversed.affected_files;
            return Ok(result);
        }
        if reversed.reversed_diff.is_empty() {
            return Ok(EditResult::ok("nothing to reverse"));
        }
        let mut result = self
            .apply_unified_diff(&reversed.reversed_diff, apply_opts)
            .await?;
        result.message = format!("Reverse applied: {}", result.message);
        Ok(result)
    }

    fn apply_internally(
        &self,
        diff_text: &str,
        files: &[FileDiff],
        opts: &ApplyOptions,
    ) -> EngineResult<EditResult> {
        let base_rel = match &opts.base_dir {
            Some(dir) => {
                let (_, rel) = self.workspace.resolve_pair(dir)?;
                rel
            }
            None => String::new(),
        };

        let mut per_file = Vec::new();
        let mut affected = Vec::new();
        let mut total_changes = 0usize;

        for fd in files {
            let Some(path) = fd.target_path() else {
                continue;
            };
            let target = if base_rel.is_empty() {
                path.clone()
            } else {
                format!("{base_rel}/{path}")
            };
            affected.push(target.clone());

            match self.apply_one_file(fd, &target, opts.dry_run) {
                Ok(changes) => {
                    total_changes += changes;
                    per_file.push(FileApplyResult {
                        path: target,
                        success: true,
                        message: if opts.dry_run {
                            format!("would apply {} hunk(s)", fd.hunks.len())
                        } else {
                            format!("applied {} hunk(s)", fd.hunks.len())
                        },
                    });
                }
                Err(e) => {
                    warn!(path = %target, error = %e, "file diff failed to apply");
                    per_file.push(FileApplyResult {
                        path: target,
                        success: false,
                        message: e.to_string(),
                    });
                }
            }
        }

        let failed = per_file.iter().filter(|r| !r.success).count();
        let success = failed == 0;
        let message = if success {
            let verb = if opts.dry_run { "Would apply" } else { "Applied" };
            format!(
                "{verb} {} file(s), {} change(s)",
                per_file.len(),
                total_changes
            )
        } else {
            format!("{failed} of {} file(s) failed to apply", per_file.len())
        };

        let mut result = if success {
            EditResult::ok(message)
        } else {
            EditResult::failure(message)
        };
        result.diff = Some(diff_text.to_string());
        result.changes_applied = total_changes;
        result.affected_files = affected;
        result.is_multi_file = files.len() > 1;
        result.per_file_results = per_file;
        Ok(result)
    }

    /// Apply one file's hunks. Returns the number of changed lines.
    fn apply_one_file(&self, fd: &FileDiff, target: &str, dry_run: bool) -> EngineResult<usize> {
        let (abs, _rel) = self.workspace.resolve_pair(target)?;
        let pre = read_text_if_exists(&abs)?;

        if pre.is_none() && !fd.is_creation() {
            return Err(EngineError::FileNotFound { path: abs });
        }

        let (patched, changes) = apply_hunks(pre.as_deref().unwrap_or(""), fd)?;

        if dry_run {
            return Ok(changes);
        }

        if fd.is_deletion() && diff::is_file_deletion(&fd.new_path) {
            // `+++ /dev/null` means the file itself goes away.
            std::fs::remove_file(&abs)?;
        } else {
            atomic_write(&abs, &patched)?;
        }
        Ok(changes)
    }

    async fn apply_with_patch_tool(
        &self,
        diff_text: &str,
        opts: &ApplyOptions,
    ) -> EngineResult<EditResult> {
        let cwd = match &opts.base_dir {
            Some(dir) => self.workspace.resolve(dir)?,
            None => self.workspace.root().to_path_buf(),
        };
        let mut args: Vec<String> = ["-u", "-p1", "-E", "--batch"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        if opts.dry_run {
            args.push("--dry-run".into());
        }

        debug!(tool = %self.config.patch_tool, "applying diff via external patch tool");
        let output = self
            .runner
            .run(
                &self.config.patch_tool,
                &args,
                Some(diff_text),
                &cwd,
                Duration::from_secs(self.config.patch_timeout_secs),
            )
            .await?;

        let files = parse_multi_file_diff(diff_text);
        let affected: Vec<String> = files.iter().filter_map(|f| f.target_path()).collect();
        let outcome = analyze_patch_result(
            output.exit_code,
            &output.stdout,
            &output.stderr,
            diff_text,
            &affected.join(", "),
        );

        let mut result = if outcome.success {
            let verb = if opts.dry_run { "Would apply" } else { "Applied" };
            EditResult::ok(format!(
                "{verb} {} file(s) via {}",
                affected.len(),
                self.config.patch_tool
            ))
        } else {
            EditResult::failure(
                outcome
                    .detailed_error
                    .unwrap_or_else(|| "patch tool failed".into()),
            )
        };
        result.diff = Some(diff_text.to_string());
        result.changes_applied = if outcome.success {
            count_diff_changes(diff_text)
        } else {
            0
        };
        result.is_multi_file = files.len() > 1;
        result.per_file_results = affected
            .iter()
            .map(|p| FileApplyResult {
                path: p.clone(),
                success: outcome.success,
                message: if outcome.success { "applied" } else { "failed" }.into(),
            })
            .collect();
        result.affected_files = affected;
        Ok(result)
    }
}

/// Apply `fd`'s hunks to `original`, verifying context lines.
///
/// Returns the patched text and the number of changed lines.
fn apply_hunks(original: &str, fd: &FileDiff) -> EngineResult<(String, usize)> {
    let mut lines: Vec<String> = original.lines().map(str::to_string).collect();
    let mut offset: i64 = 0;
    let mut changes = 0usize;
    let mut trailing_newline = original.is_empty() || original.ends_with('\n');

    for hunk in &fd.hunks {
        let start0 = if hunk.old_count == 0 {
            // Pure insertion: the header names the line to insert after.
            ((hunk.old_start as i64 + offset).max(0) as usize).min(lines.len())
        } else {
            (hunk.old_start as i64 + offset - 1).max(0) as usize
        };

        let expected_old: Vec<&str> = hunk
            .lines
            .iter()
            .filter(|l| l.kind != LineKind::Addition)
            .map(|l| l.text.as_str())
            .collect();

        for (i, expected) in expected_old.iter().enumerate() {
            let idx = start0 + i;
            if idx >= lines.len() {
                return Err(EngineError::HunkApplicationFailed {
                    line: idx + 1,
                    message: format!(
                        "file has {} lines but the hunk expects line {}",
                        lines.len(),
                        idx + 1
                    ),
                });
            }
            if lines[idx] != **expected {
                return Err(EngineError::HunkApplicationFailed {
                    line: idx + 1,
                    message: format!(
                        "context mismatch: expected {expected:?}, found {:?}",
                        lines[idx]
                    ),
                });
            }
        }

        let replacement: Vec<String> = hunk
            .lines
            .iter()
            .filter(|l| l.kind != LineKind::Deletion)
            .map(|l| l.text.clone())
            .collect();

        for line in &hunk.lines {
            match line.kind {
                LineKind::Context => {}
                _ => changes += 1,
            }
            if line.no_newline {
                trailing_newline = line.kind == LineKind::Deletion;
            }
        }

        let old_span = expected_old.len();
        lines.splice(start0..start0 + old_span, replacement.iter().cloned());
        offset += replacement.len() as i64 - old_span as i64;
    }

    let mut patched = lines.join("\n");
    if !patched.is_empty() && trailing_newline {
        patched.push('\n');
    }
    Ok((patched, changes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::tests::runtime;
    use crate::runtime::WriteMode;
    use crate::diff::{generate_unified_diff, DiffOptions, DEV_NULL};

    fn diff_for(old: &str, new: &str, path: &str) -> String {
        let old_label = if old.is_empty() { DEV_NULL } else { path };
        let new_label = if new.is_empty() { DEV_NULL } else { path };
        generate_unified_diff(old, new, &DiffOptions::new(old_label, new_label))
    }

    #[tokio::test]
    async fn applies_a_simple_modification() {
        let (dir, rt) = runtime();
        rt.write_file("f.txt", "agi is coming\n", WriteMode::CreateOrOverwrite)
            .unwrap();
        let diff = diff_for("agi is coming\n", "agi is here\n", "f.txt");
        let result = rt
            .apply_unified_diff(&diff, &ApplyOptions::default())
            .await
            .unwrap();
        assert!(result.success, "{}", result.message);
        assert!(!result.is_multi_file);
        assert_eq!(result.changes_applied, 2);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("f.txt")).unwrap(),
            "agi is here\n"
        );
    }

    #[tokio::test]
    async fn applies_multi_file_diff_with_creation() {
        let (dir, rt) = runtime();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        rt.write_file("src/a.js", "let a = 1;\n", WriteMode::CreateOrOverwrite)
            .unwrap();
        let d1 = diff_for("let a = 1;\n", "let a = 2;\n", "src/a.js");
        let d2 = diff_for("", "export {};\n", "src/b.js");
        let combined = format!("{d1}{d2}");

        let result = rt
            .apply_unified_diff(&combined, &ApplyOptions::default())
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.is_multi_file);
        assert_eq!(result.affected_files, vec!["src/a.js", "src/b.js"]);
        assert_eq!(result.per_file_results.len(), 2);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("src/b.js")).unwrap(),
            "export {};\n"
        );
    }

    #[tokio::test]
    async fn deletion_diff_unlinks_the_file() {
        let (dir, rt) = runtime();
        rt.write_file("gone.txt", "x\ny\n", WriteMode::CreateOrOverwrite)
            .unwrap();
        let diff = diff_for("x\ny\n", "", "gone.txt");
        let result = rt
            .apply_unified_diff(&diff, &ApplyOptions::default())
            .await
            .unwrap();
        assert!(result.success);
        assert!(!dir.path().join("gone.txt").exists());
    }

    #[tokio::test]
    async fn dry_run_leaves_the_tree_untouched() {
        let (dir, rt) = runtime();
        rt.write_file("f.txt", "old\n", WriteMode::CreateOrOverwrite)
            .unwrap();
        let diff = diff_for("old\n", "new\n", "f.txt");
        let result = rt
            .apply_unified_diff(
                &diff,
                &ApplyOptions {
                    dry_run: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.message.starts_with("Would apply"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("f.txt")).unwrap(),
            "old\n"
        );
    }

    #[tokio::test]
    async fn context_mismatch_is_a_per_file_failure() {
        let (dir, rt) = runtime();
        rt.write_file("f.txt", "different\n", WriteMode::CreateOrOverwrite)
            .unwrap();
        let diff = diff_for("old\n", "new\n", "f.txt");
        let result = rt
            .apply_unified_diff(&diff, &ApplyOptions::default())
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.per_file_results.len(), 1);
        assert!(!result.per_file_results[0].success);
        assert!(result.per_file_results[0].message.contains("context mismatch"));
        // The original survives a failed apply.
        assert_eq!(
            std::fs::read_to_string(dir.path().join("f.txt")).unwrap(),
            "different\n"
        );
    }

    #[tokio::test]
    async fn partial_multi_file_failure_reports_both() {
        let (_dir, rt) = runtime();
        rt.write_file("good.txt", "a\n", WriteMode::CreateOrOverwrite)
            .unwrap();
        let d1 = diff_for("a\n", "b\n", "good.txt");
        let d2 = diff_for("missing\n", "other\n", "absent.txt");
        let result = rt
            .apply_unified_diff(&format!("{d1}{d2}"), &ApplyOptions::default())
            .await
            .unwrap();
        assert!(!result.success);
        let ok: Vec<bool> = result.per_file_results.iter().map(|r| r.success).collect();
        assert_eq!(ok, vec![true, false]);
    }

    #[tokio::test]
    async fn malformed_diff_is_rejected_before_any_write() {
        let (_dir, rt) = runtime();
        let err = rt
            .apply_unified_diff("not a diff\n", &ApplyOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidDiffFormat(_)));
    }

    #[tokio::test]
    async fn base_dir_prefixes_targets() {
        let (dir, rt) = runtime();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        rt.write_file("sub/f.txt", "1\n", WriteMode::CreateOrOverwrite)
            .unwrap();
        let diff = diff_for("1\n", "2\n", "f.txt");
        let result = rt
            .apply_unified_diff(
                &diff,
                &ApplyOptions {
                    base_dir: Some("sub".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(result.success, "{}", result.message);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("sub/f.txt")).unwrap(),
            "2\n"
        );
    }

    #[tokio::test]
    async fn save_diff_path_stores_the_diff() {
        let (dir, rt) = runtime();
        rt.write_file("f.txt", "a\n", WriteMode::CreateOrOverwrite)
            .unwrap();
        let diff = diff_for("a\n", "b\n", "f.txt");
        rt.apply_unified_diff(
            &diff,
            &ApplyOptions {
                save_diff_path: Some("last.diff".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("last.diff")).unwrap(),
            diff
        );
    }

    #[tokio::test]
    async fn reverse_apply_restores_previous_content() {
        let (dir, rt) = runtime();
        rt.write_file("f.txt", "agi is here\n", WriteMode::CreateOrOverwrite)
            .unwrap();
        let diff = diff_for("agi is coming\n", "agi is here\n", "f.txt");
        let result = rt
            .reverse_apply_unified_diff(&diff, &ReverseOptions::default(), &ApplyOptions::default())
            .await
            .unwrap();
        assert!(result.success, "{}", result.message);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("f.txt")).unwrap(),
            "agi is coming\n"
        );
    }

    #[tokio::test]
    async fn reverse_apply_of_creation_deletes_the_file() {
        let (dir, rt) = runtime();
        rt.write_file("new.txt", "fresh\n", WriteMode::CreateOrOverwrite)
            .unwrap();
        let creation = diff_for("", "fresh\n", "new.txt");
        let result = rt
            .reverse_apply_unified_diff(
                &creation,
                &ReverseOptions::default(),
                &ApplyOptions::default(),
            )
            .await
            .unwrap();
        assert!(result.success);
        assert!(!dir.path().join("new.txt").exists());
    }

    mod external_patch {
        use super::*;
        use crate::config::EngineConfig;
        use crate::error::EngineError;
        use crate::process::{CommandOutput, MockProcessRunner};
        use crate::runtime::ApplyOptions;
        use crate::workspace::Workspace;
        use std::sync::Arc;

        fn runtime_with(runner: MockProcessRunner) -> (tempfile::TempDir, Runtime) {
            let dir = tempfile::tempdir().unwrap();
            let ws = Workspace::new(dir.path()).unwrap();
            let config = EngineConfig {
                prefer_external_patch: true,
                ..EngineConfig::default()
            };
            (dir, Runtime::with_runner(ws, config, Arc::new(runner)))
        }

        #[tokio::test]
        async fn unavailable_tool_falls_back_to_internal_applier() {
            let mut runner = MockProcessRunner::new();
            runner.expect_run().returning(|tool, _, _, _, _| {
                Err(EngineError::PatchToolUnavailable {
                    tool: tool.to_string(),
                })
            });
            let (dir, rt) = runtime_with(runner);
            rt.write_file("f.txt", "old\n", crate::runtime::WriteMode::CreateOrOverwrite)
                .unwrap();
            let diff = diff_for("old\n", "new\n", "f.txt");
            let result = rt
                .apply_unified_diff(&diff, &ApplyOptions::default())
                .await
                .unwrap();
            assert!(result.success, "{}", result.message);
            assert_eq!(
                std::fs::read_to_string(dir.path().join("f.txt")).unwrap(),
                "new\n"
            );
        }

        #[tokio::test]
        async fn nonzero_exit_is_classified() {
            let mut runner = MockProcessRunner::new();
            runner.expect_run().returning(|_, _, _, _, _| {
                Ok(CommandOutput {
                    exit_code: 1,
                    stdout: String::new(),
                    stderr: "patch: **** malformed patch at line 3".into(),
                })
            });
            let (_dir, rt) = runtime_with(runner);
            let diff = diff_for("old\n", "new\n", "f.txt");
            let result = rt
                .apply_unified_diff(&diff, &ApplyOptions::default())
                .await
                .unwrap();
            assert!(!result.success);
            assert!(result.message.contains("malformed at line 3"));
        }

        #[tokio::test]
        async fn timeout_propagates_as_typed_error() {
            let mut runner = MockProcessRunner::new();
            runner
                .expect_run()
                .returning(|_, _, _, _, _| Err(EngineError::PatchToolTimeout { seconds: 30 }));
            let (_dir, rt) = runtime_with(runner);
            let diff = diff_for("old\n", "new\n", "f.txt");
            let err = rt
                .apply_unified_diff(&diff, &ApplyOptions::default())
                .await
                .unwrap_err();
            assert!(matches!(err, EngineError::PatchToolTimeout { .. }));
        }
    }

    #[test]
    fn apply_hunks_preserves_missing_trailing_newline() {
        let diff_text = "--- a/f\n+++ b/f\n@@ -1,1 +1,1 @@\n-x\n\\ No newline at end of file\n+y\n\\ No newline at end of file\n";
        let fd = &parse_multi_file_diff(diff_text)[0];
        let (patched, changes) = apply_hunks("x", fd).unwrap();
        assert_eq!(patched, "y");
        assert_eq!(changes, 2);
    }

    #[test]
    fn apply_hunks_adds_trailing_newline_when_new_side_has_one() {
        let diff_text = "--- a/f\n+++ b/f\n@@ -1,1 +1,1 @@\n-x\n\\ No newline at end of file\n+y\n";
        let fd = &parse_multi_file_diff(diff_text)[0];
        let (patched, _) = apply_hunks("x", fd).unwrap();
        assert_eq!(patched, "y\n");
    }

    #[test]
    fn apply_hunks_creation_into_empty() {
        let diff_text = "--- /dev/null\n+++ b/f\n@@ -1,0 +1,2 @@\n+a\n+b\n";
        let fd = &parse_multi_file_diff(diff_text)[0];
        let (patched, changes) = apply_hunks("", fd).unwrap();
        assert_eq!(patched, "a\nb\n");
        assert_eq!(changes, 2);
    }

    #[test]
    fn apply_hunks_git_style_zero_zero_creation() {
        let diff_text = "--- /dev/null\n+++ b/f\n@@ -0,0 +1,1 @@\n+solo\n";
        let fd = &parse_multi_file_diff(diff_text)[0];
        let (patched, _) = apply_hunks("", fd).unwrap();
        assert_eq!(patched, "solo\n");
    }
}
