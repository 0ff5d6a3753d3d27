//! Classification of external patch-tool output.

use regex::Regex;
use std::sync::OnceLock;

/// Classified result of one external patch invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    pub success: bool,
    pub detailed_error: Option<String>,
}

fn malformed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"malformed patch at line (\d+)").expect("static regex"))
}

fn failed_hunks_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d+) out of (\d+) hunks? (?:FAILED|failed|ignored)").expect("static regex")
    })
}

/// Interpret a patch tool's exit code and output.
///
/// Success iff the exit code is zero. On failure the detailed error
/// classifies the most specific recognizable cause and always carries a
/// compact context summary of the attempted diff.
pub fn analyze_patch_result(
    exit_code: i32,
    stdout: &str,
    stderr: &str,
    diff: &str,
    target: &str,
) -> PatchOutcome {
    if exit_code == 0 {
        return PatchOutcome {
            success: true,
            detailed_error: None,
        };
    }

    let combined = format!("{stdout}\n{stderr}");
    let mut detail = if let Some(caps) = malformed_re().captures(&combined) {
        format!("patch input is malformed at line {}", &caps[1])
    } else if combined.contains("No such file")
        || combined.contains("No file to patch")
        || combined.contains("can't find file")
    {
        format!("target file not found: {target}")
    } else if let Some(caps) = failed_hunks_re().captures(&combined) {
        format!("{} of {} hunks failed to apply to {target}", &caps[1], &caps[2])
    } else {
        format!("patch exited with code {exit_code}")
    };

    let total_lines = diff.lines().count();
    let hunk_count = diff.lines().filter(|l| l.starts_with("@@")).count();
    detail.push_str(&format!(
        " [diff: {total_lines} lines, {hunk_count} hunks, target: {target}]"
    ));

    PatchOutcome {
        success: false,
        detailed_error: Some(detail),
    }
}
