//! Snapshot log: an ordered, linked record of every edit operation.

mod manager;
mod types;

pub use manager::{ListOptions, SnapshotContext, SnapshotManager, SnapshotOutcome};
pub use types::{ExternalChange, ExternalChangeKind, FileState, Snapshot, SnapshotTool};
