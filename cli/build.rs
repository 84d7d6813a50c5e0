//! Stamps the git revision and build date into `appsync --version`

use std::process::Command;

use chrono::Utc;

/// Trimmed stdout of a git command, or None when git is missing or fails
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn main() {
    let revision = match (git(&["rev-parse", "--short", "HEAD"]), git(&["status", "--porcelain"])) {
        (Some(hash), Some(_)) => format!("{}-dirty", hash),
        (Some(hash), None) => hash,
        (None, _) => "unknown".to_string(),
    };

    println!("cargo:rustc-env=APPSYNC_GIT_REVISION={}", revision);
    println!("cargo:rustc-env=APPSYNC_BUILD_DATE={}", Utc::now().format("%Y-%m-%d"));
    println!("cargo:rerun-if-changed=../.git/HEAD");
}
