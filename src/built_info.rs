//! Build-time metadata stamped by `build.rs` via the `built` crate: package
//! version, target triple, and git commit, if available.

include!(concat!(env!("OUT_DIR"), "/built.rs"));

/// A one-line summary suitable for a startup log line, e.g.
/// `wavebox-host 0.1.0 (a1b2c3d) built for x86_64-unknown-linux-gnu`.
pub fn summary() -> String {
    let commit = GIT_COMMIT_HASH_SHORT.unwrap_or("unknown");
    format!("{PKG_NAME} {PKG_VERSION} ({commit}) built for {TARGET}")
}
