//! Snapshot-backed file editing engine for coding agents.
//!
//! Three layers, leaves first:
//!
//! - [`diff`] — pure unified diff engine: generate, parse, validate,
//!   reverse, analyze. No I/O.
//! - [`runtime`] — file mutation primitives (whole-file, edit-block, ranged,
//!   unified-diff apply) returning structured [`runtime::EditResult`]s.
//! - [`snapshot`] — the ordered, linked log of every mutation with
//!   external-change reconciliation and consolidation.
//!
//! [`EditEngine`] ties them together: each successful mutation runs as a
//! single-writer snapshot transaction against one workspace root.
//!
//! ```no_run
//! use edit_engine::{EditEngine, WriteMode};
//!
//! # async fn demo() -> Result<(), edit_engine::EngineError> {
//! let engine = EditEngine::new("/path/to/workspace")?;
//! let outcome = engine
//!     .write_file(
//!         "src/main.rs",
//!         "fn main() {}\n",
//!         WriteMode::CreateOrOverwrite,
//!         "create main.rs",
//!         "bootstrap the crate",
//!     )
//!     .await?;
//! assert!(outcome.snapshot_id.is_some());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod diff;
mod engine;
pub mod error;
pub mod process;
pub mod runtime;
pub mod snapshot;
pub mod workspace;

pub use config::EngineConfig;
pub use engine::{EditEngine, EditOutcome};
pub use error::{EngineError, EngineResult, ErrorKind};
pub use runtime::{ApplyOptions, EditResult, FileApplyResult, ReadOptions, Runtime, WriteMode};
pub use snapshot::{
    ExternalChange, ExternalChangeKind, FileState, ListOptions, Snapshot, SnapshotManager,
    SnapshotTool,
};
pub use workspace::Workspace;
