//! Build script for jobbridge
//!
//! Stamps the binary with the commit it was built from and the build time,
//! both surfaced by `--version` and `GET /version`.

use std::process::Command;

use chrono::{SecondsFormat, Utc};

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
    // Source tarballs have no repository
    let git_hash = git(&["describe", "--always", "--dirty", "--abbrev=10"])
        .unwrap_or_else(|| "unknown".into());

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!(
        "cargo:rustc-env=BUILD_TIME={}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
    );

    if let Some(head) = git(&["rev-parse", "--git-path", "HEAD"]) {
        println!("cargo:rerun-if-changed={}", head);
    }
}
