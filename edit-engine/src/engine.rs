//! The engine facade: runtime operations wrapped in snapshot transactions.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::EngineConfig;
use crate::diff::{ensure_diff_line_ending, parse_multi_file_diff, reverse_diff, ReverseOptions};
use crate::error::EngineResult;
use crate::process::ProcessRunner;
use crate::runtime::{ApplyOptions, EditResult, ReadOptions, Runtime, WriteMode};
use crate::snapshot::{
    ListOptions, Snapshot, SnapshotContext, SnapshotManager, SnapshotTool,
};
use crate::workspace::Workspace;

/// Result of one engine operation: the runtime's edit result plus the id of
/// the appended snapshot, when one was recorded.
#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub result: EditResult,
    pub snapshot_id: Option<String>,
}

/// One workspace's editing engine: [`Runtime`] + [`SnapshotManager`] behind
/// a single object. Every successful mutation appends a snapshot; dry runs
/// and read-only operations bypass the log.
pub struct EditEngine {
    workspace: Workspace,
    runtime: Runtime,
    snapshots: SnapshotManager,
}

impl EditEngine {
    pub fn new(root: impl AsRef<Path>) -> EngineResult<Self> {
        Self::with_config(root, EngineConfig::default())
    }

    pub fn with_config(root: impl AsRef<Path>, config: EngineConfig) -> EngineResult<Self> {
        let workspace = Workspace::new(root)?;
        let snapshots = SnapshotManager::new(workspace.clone(), config.context_lines);
        let runtime = Runtime::new(workspace.clone(), config);
        Ok(Self {
            workspace,
            runtime,
            snapshots,
        })
    }

    /// Swap the external-process seam (tests, embedded hosts).
    pub fn with_runner(
        root: impl AsRef<Path>,
        config: EngineConfig,
        runner: Arc<dyn ProcessRunner>,
    ) -> EngineResult<Self> {
        let workspace = Workspace::new(root)?;
        let snapshots = SnapshotManager::new(workspace.clone(), config.context_lines);
        let runtime = Runtime::with_runner(workspace.clone(), config, runner);
        Ok(Self {
            workspace,
            runtime,
            snapshots,
        })
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn snapshots(&self) -> &SnapshotManager {
        &self.snapshots
    }

    /// Read a file (no snapshot).
    pub fn read_file(&self, path: &str, opts: &ReadOptions) -> EngineResult<String> {
        self.runtime.read_file(path, opts)
    }

    /// Whole-file write (create/overwrite/append/range), snapshotted.
    pub async fn write_file(
        &self,
        path: &str,
        content: &str,
        mode: WriteMode,
        description: &str,
        goal: &str,
    ) -> EngineResult<EditOutcome> {
        let (_, rel) = self.workspace.resolve_pair(path)?;
        let tool = match mode {
            WriteMode::OverwriteRange { .. } => SnapshotTool::RangedEdit,
            _ => SnapshotTool::WholeFileEdit,
        };
        let ctx = SnapshotContext::new(tool, description, goal);
        self.record(ctx, vec![rel], || {
            std::future::ready(self.runtime.write_file(path, content, mode))
        })
        .await
    }

    /// Search/replace block edit, snapshotted.
    pub async fn apply_edit_block(
        &self,
        path: &str,
        search: &str,
        replace: &str,
        ignore_whitespace: bool,
        description: &str,
        goal: &str,
    ) -> EngineResult<EditOutcome> {
        let (_, rel) = self.workspace.resolve_pair(path)?;
        let ctx = SnapshotContext::new(SnapshotTool::EditBlock, description, goal);
        self.record(ctx, vec![rel], || {
            std::future::ready(
                self.runtime
                    .apply_edit_block(path, search, replace, ignore_whitespace),
            )
        })
        .await
    }

    /// Line-range edit, snapshotted.
    pub async fn apply_ranged_edit(
        &self,
        path: &str,
        content: &str,
        start: i64,
        end: i64,
        description: &str,
        goal: &str,
    ) -> EngineResult<EditOutcome> {
        let (_, rel) = self.workspace.resolve_pair(path)?;
        let ctx = SnapshotContext::new(SnapshotTool::RangedEdit, description, goal);
        self.record(ctx, vec![rel], || {
            std::future::ready(self.runtime.apply_ranged_edit(path, content, start, end))
        })
        .await
    }

    /// Apply a unified diff, snapshotted. Dry runs bypass the log.
    pub async fn apply_unified_diff(
        &self,
        diff_text: &str,
        opts: &ApplyOptions,
        description: &str,
        goal: &str,
    ) -> EngineResult<EditOutcome> {
        if opts.dry_run {
            debug!("dry-run unified diff apply, no snapshot");
            let result = self.runtime.apply_unified_diff(diff_text, opts).await?;
            return Ok(EditOutcome {
                result,
                snapshot_id: None,
            });
        }
        let affected = self.diff_targets(diff_text, &opts.base_dir);
        let ctx = SnapshotContext::new(SnapshotTool::UnifiedDiff, description, goal);
        self.record(ctx, affected, || {
            self.runtime.apply_unified_diff(diff_text, opts)
        })
        .await
    }

    /// Reverse a diff and apply the reversal, snapshotted.
    pub async fn reverse_apply_unified_diff(
        &self,
        diff_text: &str,
        reverse_opts: &ReverseOptions,
        apply_opts: &ApplyOptions,
        description: &str,
        goal: &str,
    ) -> EngineResult<EditOutcome> {
        if apply_opts.dry_run {
            let result = self
                .runtime
                .reverse_apply_unified_diff(diff_text, reverse_opts, apply_opts)
                .await?;
            return Ok(EditOutcome {
                result,
                snapshot_id: None,
            });
        }
        let reversed = reverse_diff(diff_text, reverse_opts);
        let affected = self.diff_targets(&reversed.reversed_diff, &apply_opts.base_dir);
        let ctx = SnapshotContext::new(SnapshotTool::UnifiedDiff, description, goal);
        self.record(ctx, affected, || {
            self.runtime
                .reverse_apply_unified_diff(diff_text, reverse_opts, apply_opts)
        })
        .await
    }

    /// Delete one file, snapshotted.
    pub async fn delete_file(
        &self,
        path: &str,
        description: &str,
        goal: &str,
    ) -> EngineResult<EditOutcome> {
        let (_, rel) = self.workspace.resolve_pair(path)?;
        let ctx = SnapshotContext::new(SnapshotTool::Delete, description, goal);
        self.record(ctx, vec![rel], || {
            std::future::ready(self.runtime.delete_file(path))
        })
        .await
    }

    /// Delete a directory, snapshotting the removal of every file beneath it.
    pub async fn delete_directory(
        &self,
        path: &str,
        recursive: bool,
        description: &str,
        goal: &str,
    ) -> EngineResult<EditOutcome> {
        let affected = self.runtime.list_directory_files(path)?;
        let ctx = SnapshotContext::new(SnapshotTool::DirectoryDelete, description, goal);
        self.record(ctx, affected, || {
            std::future::ready(self.runtime.delete_directory(path, recursive))
        })
        .await
    }

    /// Create a directory. No file content changes, so no snapshot.
    pub fn create_directory(&self, path: &str, recursive: bool) -> EngineResult<EditOutcome> {
        let result = self.runtime.create_directory(path, recursive)?;
        Ok(EditOutcome {
            result,
            snapshot_id: None,
        })
    }

    /// Diff two workspace files (no snapshot).
    pub fn compare_files(&self, path_a: &str, path_b: &str) -> EngineResult<String> {
        self.runtime.compare_files(path_a, path_b)
    }

    /// List snapshots in insertion order.
    pub async fn list_snapshots(&self, opts: &ListOptions) -> Vec<Snapshot> {
        self.snapshots.list(opts).await
    }

    /// Consolidate an inclusive sequence range into one snapshot.
    pub async fn consolidate_snapshots(
        &self,
        start: u64,
        end: u64,
        title: &str,
        goal: &str,
    ) -> EngineResult<Snapshot> {
        self.snapshots.consolidate(start, end, title, goal).await
    }

    async fn record<F, Fut>(
        &self,
        ctx: SnapshotContext,
        affected: Vec<String>,
        mutate: F,
    ) -> EngineResult<EditOutcome>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = EngineResult<EditResult>>,
    {
        let outcome = self
            .snapshots
            .create_snapshot(ctx, &affected, mutate)
            .await?;
        Ok(EditOutcome {
            result: outcome.result,
            snapshot_id: outcome.snapshot.map(|s| s.id),
        })
    }

    /// Canonical target paths of a diff, with any base dir prefixed.
    fn diff_targets(&self, diff_text: &str, base_dir: &Option<String>) -> Vec<String> {
        let normalized = ensure_diff_line_ending(diff_text);
        parse_multi_file_diff(&normalized)
            .iter()
            .filter_map(|fd| fd.target_path())
            .map(|p| match base_dir {
                Some(base) if !base.is_empty() => format!("{base}/{p}"),
                _ => p,
            })
            .collect()
    }
}
