//! Short content hashes and git-style header helpers.

use std::fmt::Write as _;

use sha1::{Digest, Sha1};

use super::extract_file_path_from_diff;

/// 7-hex-digit short SHA-1 of `content`, as used in `index OLD..NEW` lines.
pub fn calculate_file_hash(content: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        let _ = write!(&mut out, "{byte:02x}");
    }
    out.truncate(7);
    out
}

/// Current local time as a git header timestamp: `SECONDS ±HHMM`.
pub fn get_git_timestamp() -> String {
    chrono::Local::now().format("%s %z").to_string()
}

/// Retrofit `diff --git` / `index` preamble lines onto a plain single-file
/// diff, hashing the supplied old/new contents.
///
/// Returns the diff unchanged when no file path can be extracted from it.
pub fn add_file_hashes_to_diff(diff: &str, old_content: &str, new_content: &str) -> String {
    if diff.is_empty() || diff.starts_with("diff --git ") {
        return diff.to_string();
    }
    let Some(path) = extract_file_path_from_diff(diff) else {
        return diff.to_string();
    };
    format!(
        "diff --git a/{path} b/{path}\nindex {}..{} 100644\n{diff}",
        calculate_file_hash(old_content),
        calculate_file_hash(new_content)
    )
}
