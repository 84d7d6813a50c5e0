//! Utility functions

use rand::distributions::Alphanumeric;
use rand::Rng;
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Build information printed by `appsync --version`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub version: String,

    /// Short git revision, suffixed `-dirty` for uncommitted builds
    pub revision: String,

    pub build_date: String,
}

pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        revision: option_env!("APPSYNC_GIT_REVISION").unwrap_or("unknown").to_string(),
        build_date: option_env!("APPSYNC_BUILD_DATE").unwrap_or("unknown").to_string(),
    }
}

/// Random alphanumeric string, used for temporary archive names
pub fn generate_random_filename(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Calculate SHA256 hash of data as lowercase hex
pub fn sha256_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Check a target binary version range the way npm-style ranges are written:
/// space separated comparators, `||` alternatives and `a - b` hyphen ranges.
pub fn is_valid_semver_range(range: &str) -> bool {
    range.split("||").all(|alternative| {
        let alternative = alternative.trim();
        if alternative.is_empty() {
            return true;
        }

        if let Some((low, high)) = alternative.split_once(" - ") {
            return is_partial_version(low.trim()) && is_partial_version(high.trim());
        }

        let mut comparators: Vec<String> = Vec::new();
        let mut pending_op = String::new();
        for token in alternative.split_whitespace() {
            if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
                pending_op.push_str(token);
                continue;
            }
            comparators.push(strip_v(&format!("{}{}", pending_op, token)));
            pending_op.clear();
        }
        if !pending_op.is_empty() {
            return false;
        }

        VersionReq::parse(&comparators.join(", ")).is_ok()
    })
}

fn strip_v(token: &str) -> String {
    let op_len = token
        .find(|c: char| !matches!(c, '<' | '>' | '=' | '~' | '^'))
        .unwrap_or(token.len());
    let (op, version) = token.split_at(op_len);
    // `~>` is the tilde operator written ruby-style
    let op = if op == "~>" { "~" } else { op };
    let version = version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version);
    format!("{}{}", op, version)
}

fn is_partial_version(version: &str) -> bool {
    let version = strip_v(version);
    Version::parse(&version).is_ok() || VersionReq::parse(&format!("={}", version)).is_ok()
}
