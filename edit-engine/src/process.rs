//! External process invocation seam.
//!
//! The runtime talks to the external patch utility exclusively through
//! [`ProcessRunner`], so its absence can be tolerated and tests can swap in
//! a mock.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{EngineError, EngineResult};

/// Captured output of one external command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Runs an external command with piped stdin and a hard timeout.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run<'a>(
        &self,
        program: &str,
        args: &[String],
        stdin: Option<&'a str>,
        cwd: &Path,
        timeout: Duration,
    ) -> EngineResult<CommandOutput>;
}

/// [`ProcessRunner`] backed by `tokio::process`.
///
/// A missing binary maps to `PatchToolUnavailable`; exceeding the timeout
/// kills the child and maps to `PatchToolTimeout`.
#[derive(Debug, Clone, Default)]
pub struct SystemProcessRunner;

#[async_trait]
impl ProcessRunner for SystemProcessRunner {
    async fn run<'a>(
        &self,
        program: &str,
        args: &[String],
        stdin: Option<&'a str>,
        cwd: &Path,
        timeout: Duration,
    ) -> EngineResult<CommandOutput> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(cwd)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EngineError::PatchToolUnavailable {
                    tool: program.to_string(),
                }
            } else {
                EngineError::Io(e)
            }
        })?;

        if let Some(input) = stdin {
            let mut pipe = child.stdin.take().ok_or_else(|| {
                EngineError::Io(std::io::Error::other("child stdin was not piped"))
            })?;
            pipe.write_all(input.as_bytes()).await?;
            // Closing the pipe lets the child see EOF.
            drop(pipe);
        }

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(out)) => Ok(CommandOutput {
                exit_code: out.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            }),
            Ok(Err(e)) => Err(EngineError::Io(e)),
            Err(_) => Err(EngineError::PatchToolTimeout {
                seconds: timeout.as_secs(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_a_simple_command() {
        let dir = tempfile::tempdir().unwrap();
        let out = SystemProcessRunner
            .run(
                "sh",
                &["-c".to_string(), "echo hello".to_string()],
                None,
                dir.path(),
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        assert_eq!(out.exit_code, 0);
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn stdin_is_piped_through() {
        let dir = tempfile::tempdir().unwrap();
        let out = SystemProcessRunner
            .run(
                "cat",
                &[],
                Some("piped input"),
                dir.path(),
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        assert_eq!(out.stdout, "piped input");
    }

    #[tokio::test]
    async fn missing_binary_maps_to_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = SystemProcessRunner
            .run(
                "definitely-not-a-real-binary-xyz",
                &[],
                None,
                dir.path(),
                Duration::from_secs(5),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::PatchToolUnavailable { .. }));
    }

    #[tokio::test]
    async fn timeout_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let err = SystemProcessRunner
            .run(
                "sleep",
                &["5".to_string()],
                None,
                dir.path(),
                Duration::from_millis(50),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::PatchToolTimeout { .. }));
    }
}
