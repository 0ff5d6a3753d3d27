//! Unified diff tools: apply, reverse, compare.

use std::sync::Arc;

use async_trait::async_trait;
use edit_engine::diff::ReverseOptions;
use edit_engine::{ApplyOptions, EditEngine};
use serde::Deserialize;
use tracing::debug;

use crate::output::ToolOutput;
use crate::{parse_args, to_value, EditTool, ToolDefinition, ToolError};

// ---------------------------------------------------------------------------
// ApplyUnifiedDiff
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ApplyDiffArgs {
    /// Unified diff text (git-style headers accepted), possibly multi-file.
    diff: String,
    #[serde(default)]
    dry_run: bool,
    base_dir: Option<String>,
    save_diff_path: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    goal: String,
}

/// Apply a (multi-file) unified diff to the workspace.
pub struct ApplyUnifiedDiff {
    engine: Arc<EditEngine>,
}

impl ApplyUnifiedDiff {
    pub fn new(engine: Arc<EditEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl EditTool for ApplyUnifiedDiff {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "ApplyUnifiedDiff".into(),
            description: "Apply a unified diff (git diff / diff -u output) to \
                          the workspace. Supports multi-file diffs, file \
                          creation via /dev/null headers, and file deletion. \
                          Per-file results are reported; dry_run previews \
                          without writing."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "diff": {
                        "type": "string",
                        "description": "Full unified diff text"
                    },
                    "dry_run": {
                        "type": "boolean",
                        "description": "Report what would happen without mutating (default: false)"
                    },
                    "base_dir": {
                        "type": "string",
                        "description": "Workspace-relative directory the diff paths are resolved against"
                    },
                    "save_diff_path": {
                        "type": "string",
                        "description": "Also save the incoming diff to this workspace-relative path"
                    },
                    "description": {
                        "type": "string",
                        "description": "Short human-readable summary of the change"
                    },
                    "goal": {
                        "type": "string",
                        "description": "Why this change is being made"
                    }
                },
                "required": ["diff"],
                "additionalProperties": false
            }),
        }
    }

    async fn call(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: ApplyDiffArgs = parse_args("ApplyUnifiedDiff", args)?;
        debug!(dry_run = args.dry_run, "ApplyUnifiedDiff");
        let opts = ApplyOptions {
            base_dir: args.base_dir,
            dry_run: args.dry_run,
            save_diff_path: args.save_diff_path,
        };
        let outcome = self
            .engine
            .apply_unified_diff(&args.diff, &opts, &args.description, &args.goal)
            .await?;
        to_value("ApplyUnifiedDiff", &ToolOutput::from_outcome(outcome))
    }
}

// ---------------------------------------------------------------------------
// ReverseDiff
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ReverseDiffArgs {
    /// The original (forward) diff to reverse.
    diff: String,
    include_files: Option<Vec<String>>,
    exclude_files: Option<Vec<String>>,
    #[serde(default)]
    check_conflicts: bool,
    /// Apply the reversed diff to the workspace (default). When false, only
    /// the reversed diff text is returned.
    #[serde(default = "default_apply")]
    apply: bool,
    #[serde(default)]
    description: String,
    #[serde(default)]
    goal: String,
}

fn default_apply() -> bool {
    true
}

/// Reverse a unified diff and (by default) apply the reversal as an undo.
pub struct ReverseDiff {
    engine: Arc<EditEngine>,
}

impl ReverseDiff {
    pub fn new(engine: Arc<EditEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl EditTool for ReverseDiff {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "ReverseDiff".into(),
            description: "Reverse a unified diff (undo). Creations become \
                          deletions and vice versa. By default the reversed \
                          diff is applied to the workspace; set apply=false to \
                          only compute it. include_files/exclude_files filter \
                          by workspace-relative path."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "diff": {
                        "type": "string",
                        "description": "The forward diff to reverse"
                    },
                    "include_files": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Only reverse these workspace-relative paths"
                    },
                    "exclude_files": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Skip these workspace-relative paths"
                    },
                    "check_conflicts": {
                        "type": "boolean",
                        "description": "Fail when the diff contains conflicting hunks (default: false)"
                    },
                    "apply": {
                        "type": "boolean",
                        "description": "Apply the reversed diff to the workspace (default: true)"
                    },
                    "description": {
                        "type": "string",
                        "description": "Short human-readable summary of the undo"
                    },
                    "goal": {
                        "type": "string",
                        "description": "Why this undo is being made"
                    }
                },
                "required": ["diff"],
                "additionalProperties": false
            }),
        }
    }

    async fn call(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: ReverseDiffArgs = parse_args("ReverseDiff", args)?;
        let reverse_opts = ReverseOptions {
            include_files: args.include_files,
            exclude_files: args.exclude_files,
            check_conflicts: args.check_conflicts,
        };
        debug!(apply = args.apply, "ReverseDiff");

        if !args.apply {
            let reversed = edit_engine::diff::reverse_diff(&args.diff, &reverse_opts);
            let output = ToolOutput {
                success: reversed.success,
                message: reversed
                    .message
                    .unwrap_or_else(|| "reversed diff computed".into()),
                diff: Some(reversed.reversed_diff),
                changes_applied: 0,
                affected_files: reversed.affected_files,
                per_file_results: Vec::new(),
                is_multi_file: false,
                snapshot_id: None,
                error_kind: None,
            };
            return to_value("ReverseDiff", &output);
        }

        let outcome = self
            .engine
            .reverse_apply_unified_diff(
                &args.diff,
                &reverse_opts,
                &ApplyOptions::default(),
                &args.description,
                &args.goal,
            )
            .await?;
        to_value("ReverseDiff", &ToolOutput::from_outcome(outcome))
    }
}

// ---------------------------------------------------------------------------
// CompareFiles
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CompareArgs {
    path_a: String,
    path_b: String,
}

/// Diff two workspace files.
pub struct CompareFiles {
    engine: Arc<EditEngine>,
}

impl CompareFiles {
    pub fn new(engine: Arc<EditEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl EditTool for CompareFiles {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "CompareFiles".into(),
            description: "Generate a unified diff between two workspace files \
                          (first as the old side, second as the new side). \
                          Read-only."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "path_a": {
                        "type": "string",
                        "description": "Old side of the comparison"
                    },
                    "path_b": {
                        "type": "string",
                        "description": "New side of the comparison"
                    }
                },
                "required": ["path_a", "path_b"],
                "additionalProperties": false
            }),
        }
    }

    async fn call(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: CompareArgs = parse_args("CompareFiles", args)?;
        let diff = self.engine.compare_files(&args.path_a, &args.path_b)?;
        let identical = diff.is_empty();
        let output = ToolOutput {
            success: true,
            message: if identical {
                format!("{} and {} are identical", args.path_a, args.path_b)
            } else {
                format!("{} and {} differ", args.path_a, args.path_b)
            },
            diff: if identical { None } else { Some(diff) },
            changes_applied: 0,
            affected_files: vec![args.path_a, args.path_b],
            per_file_results: Vec::new(),
            is_multi_file: false,
            snapshot_id: None,
            error_kind: None,
        };
        to_value("CompareFiles", &output)
    }
}
