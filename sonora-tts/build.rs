//! Build script for sonora-tts
//!
//! Exposes build identification to the binary as compile-time env vars:
//! `SONORA_GIT_HASH`, `SONORA_BUILD_TIMESTAMP`, `SONORA_BUILD_PROFILE`.

use std::process::Command;

/// Short commit hash, or "unknown" outside a git checkout
fn git_hash() -> String {
    Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|hash| hash.trim().to_string())
        .filter(|hash| !hash.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=SONORA_GIT_HASH={}", git_hash());
    println!("cargo:rustc-env=SONORA_BUILD_TIMESTAMP={}", timestamp);
    println!("cargo:rustc-env=SONORA_BUILD_PROFILE={}", profile);

    // Re-run when the checked-out commit moves
    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rerun-if-changed=build.rs");
}
