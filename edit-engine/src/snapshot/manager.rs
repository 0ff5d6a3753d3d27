//! The snapshot log and its single-writer transaction.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::types::{ExternalChange, ExternalChangeKind, FileState, Snapshot, SnapshotTool};
use crate::diff::{generate_unified_diff, DiffOptions, DEV_NULL};
use crate::error::{EngineError, EngineResult};
use crate::runtime::{read_text_if_exists, EditResult};
use crate::workspace::Workspace;

/// Metadata describing the operation a snapshot will record.
#[derive(Debug, Clone)]
pub struct SnapshotContext {
    pub tool: SnapshotTool,
    pub description: String,
    pub goal: String,
}

impl SnapshotContext {
    pub fn new(
        tool: SnapshotTool,
        description: impl Into<String>,
        goal: impl Into<String>,
    ) -> Self {
        Self {
            tool,
            description: description.into(),
            goal: goal.into(),
        }
    }
}

/// Result of a snapshot transaction: the runtime's edit result plus the
/// appended snapshot (absent when the operation reported failure).
#[derive(Debug, Clone)]
pub struct SnapshotOutcome {
    pub result: EditResult,
    pub snapshot: Option<Snapshot>,
}

/// Options for [`SnapshotManager::list`].
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Return at most the last `limit` snapshots (still in insertion order).
    pub limit: Option<usize>,
    /// Diffs can be large; they are stripped unless requested.
    pub include_diffs: bool,
}

struct LogState {
    snapshots: Vec<Snapshot>,
    /// Most recent recorded post-content per present file. Deleted files
    /// are removed so a later reappearance registers as externally created.
    known_post_state: HashMap<String, String>,
    /// Set when a linkage sanity check fails; all writes are refused until
    /// [`SnapshotManager::reset`].
    poisoned: bool,
}

/// Ordered, linked log of snapshots for one workspace. Single-writer: the
/// whole six-step create transaction runs under one lock.
pub struct SnapshotManager {
    workspace: Workspace,
    context_lines: usize,
    state: Mutex<LogState>,
}

impl SnapshotManager {
    pub fn new(workspace: Workspace, context_lines: usize) -> Self {
        Self {
            workspace,
            context_lines,
            state: Mutex::new(LogState {
                snapshots: Vec::new(),
                known_post_state: HashMap::new(),
                poisoned: false,
            }),
        }
    }

    /// Run one edit as a snapshot transaction:
    ///
    /// 1. detect external changes on `paths`,
    /// 2. capture pre-state,
    /// 3. run `mutate` (failure aborts, log untouched),
    /// 4. capture post-state,
    /// 5. compute the multi-file diff,
    /// 6. append the linked snapshot and update the known post-state.
    pub async fn create_snapshot<F, Fut>(
        &self,
        ctx: SnapshotContext,
        paths: &[String],
        mutate: F,
    ) -> EngineResult<SnapshotOutcome>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = EngineResult<EditResult>>,
    {
        let mut state = self.state.lock().await;
        if state.poisoned {
            return Err(EngineError::SequenceCorruption(
                "snapshot log is poisoned; reset() is required before further writes".into(),
            ));
        }

        let paths = dedup_preserving_order(paths);

        // Steps 1 + 2: one disk read serves external-change detection and
        // pre-state capture.
        let mut external_changes = Vec::new();
        let mut pre_states: BTreeMap<String, Option<String>> = BTreeMap::new();
        for path in &paths {
            let abs = self.workspace.resolve(path)?;
            let on_disk = read_text_if_exists(&abs)?;
            match (state.known_post_state.get(path), &on_disk) {
                (Some(known), Some(observed)) if known != observed => {
                    warn!(path = %path, "external modification detected");
                    external_changes.push(ExternalChange {
                        path: path.clone(),
                        kind: ExternalChangeKind::Modified,
                        known_content: Some(known.clone()),
                        observed_content: Some(observed.clone()),
                    });
                }
                (Some(known), None) => {
                    warn!(path = %path, "externally deleted file detected");
                    external_changes.push(ExternalChange {
                        path: path.clone(),
                        kind: ExternalChangeKind::Deleted,
                        known_content: Some(known.clone()),
                        observed_content: None,
                    });
                }
                (None, Some(observed)) => {
                    debug!(path = %path, "file unknown to the log, recording as externally created");
                    external_changes.push(ExternalChange {
                        path: path.clone(),
                        kind: ExternalChangeKind::Created,
                        known_content: None,
                        observed_content: Some(observed.clone()),
                    });
                }
                _ => {}
            }
            pre_states.insert(path.clone(), on_disk);
        }

        // Step 3: the mutation. An error leaves the log untouched; a failed
        // result is reported but not snapshotted.
        let result = mutate().await?;
        if !result.success {
            debug!("operation failed; no snapshot appended");
            return Ok(SnapshotOutcome {
                result,
                snapshot: None,
            });
        }

        // Step 4: post-state.
        let mut file_states = BTreeMap::new();
        for path in &paths {
            let abs = self.workspace.resolve(path)?;
            let post = read_text_if_exists(&abs)?;
            file_states.insert(
                path.clone(),
                FileState {
                    pre_content: pre_states.remove(path).flatten(),
                    post_content: post,
                },
            );
        }

        // Step 5: the diff.
        let diff = self.multi_file_diff(&paths, &file_states);

        // Step 6: allocate, link, append.
        let sequence_number = state.snapshots.len() as u64 + 1;
        if let Some(last_sequence_number) = state.snapshots.last().map(|s| s.sequence_number) {
            if last_sequence_number + 1 != sequence_number {
                state.poisoned = true;
                return Err(EngineError::SequenceCorruption(format!(
                    "head sequence {} does not precede {}",
                    last_sequence_number, sequence_number
                )));
            }
        }
        let snapshot = Snapshot {
            id: Uuid::new_v4().to_string(),
            sequence_number,
            previous_id: state.snapshots.last().map(|s| s.id.clone()),
            timestamp: Utc::now(),
            tool: ctx.tool,
            description: ctx.description,
            goal: ctx.goal,
            affected_files: paths.clone(),
            file_states: file_states.clone(),
            diff,
            external_changes,
        };

        for (path, fs) in &file_states {
            match &fs.post_content {
                Some(content) => {
                    state.known_post_state.insert(path.clone(), content.clone());
                }
                None => {
                    state.known_post_state.remove(path);
                }
            }
        }
        debug!(sequence = sequence_number, id = %snapshot.id, "snapshot appended");
        state.snapshots.push(snapshot.clone());

        Ok(SnapshotOutcome {
            result,
            snapshot: Some(snapshot),
        })
    }

    /// Snapshots in insertion order.
    pub async fn list(&self, opts: &ListOptions) -> Vec<Snapshot> {
        let state = self.state.lock().await;
        let skip = match opts.limit {
            Some(limit) => state.snapshots.len().saturating_sub(limit),
            None => 0,
        };
        state.snapshots[skip..]
            .iter()
            .map(|s| {
                let mut s = s.clone();
                if !opts.include_diffs {
                    s.diff = String::new();
                }
                s
            })
            .collect()
    }

    pub async fn get(&self, id: &str) -> EngineResult<Snapshot> {
        let state = self.state.lock().await;
        state
            .snapshots
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| EngineError::SnapshotNotFound { id: id.to_string() })
    }

    pub async fn head_id(&self) -> Option<String> {
        let state = self.state.lock().await;
        state.snapshots.last().map(|s| s.id.clone())
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.snapshots.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Clear the log, the known post-state, and any poisoning.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.snapshots.clear();
        state.known_post_state.clear();
        state.poisoned = false;
    }

    /// Replace the inclusive 1-indexed sequence range `[start, end]` with a
    /// single equivalent snapshot. Pure log rewrite; the filesystem is not
    /// touched.
    pub async fn consolidate(
        &self,
        start: u64,
        end: u64,
        title: &str,
        goal: &str,
    ) -> EngineResult<Snapshot> {
        let mut state = self.state.lock().await;
        if state.poisoned {
            return Err(EngineError::SequenceCorruption(
                "snapshot log is poisoned; reset() is required before further writes".into(),
            ));
        }
        let len = state.snapshots.len() as u64;
        if start < 1 || end < start || end > len {
            return Err(EngineError::InvalidRange {
                start: start as i64,
                end: end as i64,
                reason: format!("log has {len} snapshot(s)"),
            });
        }

        let range = &state.snapshots[(start - 1) as usize..end as usize];

        // Earliest pre-state and latest post-state per file, in first-touch
        // order.
        let mut order: Vec<String> = Vec::new();
        let mut merged: BTreeMap<String, FileState> = BTreeMap::new();
        for snap in range {
            for path in &snap.affected_files {
                let Some(fs) = snap.file_states.get(path) else {
                    continue;
                };
                match merged.get_mut(path) {
                    None => {
                        order.push(path.clone());
                        merged.insert(path.clone(), fs.clone());
                    }
                    Some(existing) => {
                        existing.post_content = fs.post_content.clone();
                    }
                }
            }
        }

        let diff = self.multi_file_diff(&order, &merged);
        let previous_id = if start >= 2 {
            Some(state.snapshots[(start - 2) as usize].id.clone())
        } else {
            None
        };

        let replacement = Snapshot {
            id: Uuid::new_v4().to_string(),
            sequence_number: start,
            previous_id,
            timestamp: Utc::now(),
            tool: SnapshotTool::Consolidation,
            description: title.to_string(),
            goal: goal.to_string(),
            affected_files: order,
            file_states: merged,
            diff,
            external_changes: Vec::new(),
        };

        let replaced_id = replacement.id.clone();
        state
            .snapshots
            .splice((start - 1) as usize..end as usize, [replacement.clone()]);

        // Renumber and relink everything after the replacement.
        for idx in start as usize..state.snapshots.len() {
            state.snapshots[idx].sequence_number = idx as u64 + 1;
        }
        if let Some(next) = state.snapshots.get_mut(start as usize) {
            next.previous_id = Some(replaced_id);
        }

        debug!(start, end, "consolidated snapshot range");
        Ok(replacement)
    }

    fn multi_file_diff(
        &self,
        order: &[String],
        file_states: &BTreeMap<String, FileState>,
    ) -> String {
        let mut out = String::new();
        for path in order {
            let Some(fs) = file_states.get(path) else {
                continue;
            };
            let pre = fs.pre_content.as_deref().unwrap_or("");
            let post = fs.post_content.as_deref().unwrap_or("");
            if fs.pre_content.is_none() && fs.post_content.is_none() {
                continue;
            }
            let old_label = match fs.pre_content {
                Some(_) => path.clone(),
                None => DEV_NULL.to_string(),
            };
            let new_label = match fs.post_content {
                Some(_) => path.clone(),
                None => DEV_NULL.to_string(),
            };
            out.push_str(&generate_unified_diff(
                pre,
                post,
                &DiffOptions::new(old_label, new_label).with_context(self.context_lines),
            ));
        }
        out
    }
}

fn dedup_preserving_order(paths: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    paths
        .iter()
        .filter(|p| seen.insert(p.as_str()))
        .cloned()
        .collect()
}
