//! Error taxonomy for the editing engine.
//!
//! Every failure carries a stable [`ErrorKind`] code so the tool layer can
//! surface machine-readable error kinds without string matching.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur in the diff engine, runtime, or snapshot manager.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid path `{path}`: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("path `{path}` escapes the workspace root")]
    PathOutsideWorkspace { path: String },

    #[error("invalid line range {start}..{end}: {reason}")]
    InvalidRange { start: i64, end: i64, reason: String },

    #[error("invalid diff format: {0}")]
    InvalidDiffFormat(String),

    #[error("empty search block is not valid for existing file `{path}`")]
    EmptySearchBlock { path: String },

    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("search block not found in `{path}`{}", detail.as_deref().map(|d| format!(" ({d})")).unwrap_or_default())]
    SearchBlockNotFound {
        path: String,
        detail: Option<String>,
    },

    #[error("snapshot `{id}` not found")]
    SnapshotNotFound { id: String },

    #[error("external change conflict on `{path}`: {reason}")]
    ExternalChangeConflict { path: String, reason: String },

    #[error("hunk failed to apply at line {line}: {message}")]
    HunkApplicationFailed { line: usize, message: String },

    #[error("permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("patch tool timed out after {seconds}s")]
    PatchToolTimeout { seconds: u64 },

    #[error("patch tool `{tool}` is not available")]
    PatchToolUnavailable { tool: String },

    #[error("snapshot log corrupted: {0}")]
    SequenceCorruption(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Stable error kind codes, one per taxonomy entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidPath,
    PathOutsideWorkspace,
    InvalidRange,
    InvalidDiffFormat,
    InvalidSearchBlock,
    FileNotFound,
    SearchBlockNotFound,
    SnapshotNotFound,
    ExternalChangeConflict,
    HunkApplicationFailed,
    PermissionDenied,
    PatchToolTimeout,
    PatchToolUnavailable,
    SequenceCorruption,
    Unsupported,
    Io,
}

impl ErrorKind {
    /// The stable wire code for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidPath => "invalid_path",
            Self::PathOutsideWorkspace => "path_outside_workspace",
            Self::InvalidRange => "invalid_range",
            Self::InvalidDiffFormat => "invalid_diff_format",
            Self::InvalidSearchBlock => "invalid_search_block",
            Self::FileNotFound => "file_not_found",
            Self::SearchBlockNotFound => "search_block_not_found",
            Self::SnapshotNotFound => "snapshot_not_found",
            Self::ExternalChangeConflict => "external_change_conflict",
            Self::HunkApplicationFailed => "hunk_application_failed",
            Self::PermissionDenied => "permission_denied",
            Self::PatchToolTimeout => "patch_tool_timeout",
            Self::PatchToolUnavailable => "patch_tool_unavailable",
            Self::SequenceCorruption => "sequence_corruption",
            Self::Unsupported => "unsupported",
            Self::Io => "io_error",
        }
    }

    /// Whether this kind is a pre-execution validation failure.
    pub fn is_validation(self) -> bool {
        matches!(
            self,
            Self::InvalidPath
                | Self::PathOutsideWorkspace
                | Self::InvalidRange
                | Self::InvalidDiffFormat
                | Self::InvalidSearchBlock
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EngineError {
    /// Classify this error into its stable kind.
    ///
    /// Io errors are refined: `NotFound` and `PermissionDenied` from the
    /// filesystem map onto the corresponding taxonomy kinds.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPath { .. } => ErrorKind::InvalidPath,
            Self::PathOutsideWorkspace { .. } => ErrorKind::PathOutsideWorkspace,
            Self::InvalidRange { .. } => ErrorKind::InvalidRange,
            Self::InvalidDiffFormat(_) => ErrorKind::InvalidDiffFormat,
            Self::EmptySearchBlock { .. } => ErrorKind::InvalidSearchBlock,
            Self::FileNotFound { .. } => ErrorKind::FileNotFound,
            Self::SearchBlockNotFound { .. } => ErrorKind::SearchBlockNotFound,
            Self::SnapshotNotFound { .. } => ErrorKind::SnapshotNotFound,
            Self::ExternalChangeConflict { .. } => ErrorKind::ExternalChangeConflict,
            Self::HunkApplicationFailed { .. } => ErrorKind::HunkApplicationFailed,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::PatchToolTimeout { .. } => ErrorKind::PatchToolTimeout,
            Self::PatchToolUnavailable { .. } => ErrorKind::PatchToolUnavailable,
            Self::SequenceCorruption(_) => ErrorKind::SequenceCorruption,
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::Io(e) => match e.kind() {
                io::ErrorKind::NotFound => ErrorKind::FileNotFound,
                io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
                _ => ErrorKind::Io,
            },
        }
    }
}
