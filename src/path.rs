//! The path resolver (component C3 of the spec): copies a guest-named path
//! out of guest memory, normalizes it, and confines it to an authorized
//! root directory.
//!
//! The reference sources (`resolve_path` in `runtime.h`) stub this out to a
//! raw `memcpy`; the spec requires real confinement, since a stubbed
//! resolver defeats the sandbox's entire purpose. Normalization here is
//! purely lexical — no filesystem access, no symlink resolution — matching
//! the spec's note that the host primitive, not the resolver, is the one
//! that ultimately observes the filesystem.

use std::path::{Component, Path, PathBuf};

use tracing::{instrument, Span};

use crate::error::{log_then_return, new_error};
use crate::mem::MemTranslator;
use crate::{Result, SandboxError};

/// Copy up to `path_max` bytes from guest memory at `gptr`, find the NUL
/// terminator, normalize the resulting path against `root`, and return the
/// confined host path.
#[instrument(err(Debug), skip(mem), level = "Trace")]
pub fn resolve_path(mem: &MemTranslator, gptr: u32, root: &Path, path_max: usize) -> Result<PathBuf> {
    let raw = mem.copy_buf_from_sandbox(gptr, path_max)?;
    let nul_pos = raw
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| SandboxError::InvalidPath(format!("no NUL terminator within {path_max} bytes")))?;
    let s = std::str::from_utf8(&raw[..nul_pos])
        .map_err(|e| SandboxError::InvalidPath(format!("path is not valid UTF-8: {e}")))?;
    if s.is_empty() {
        return Err(SandboxError::InvalidPath("path is empty".to_string()));
    }
    if s.as_bytes().contains(&0) {
        return Err(new_error!("unreachable: NUL already excluded"));
    }

    normalize_under_root(s, root)
}

/// Lexically normalize `guest_path` (interpreting a leading `/` as
/// root-relative, not host-root-relative) against `root`, collapsing `.`
/// and popping `..` against components retained below the root. A `..`
/// that would pop past the root is rejected with
/// [`SandboxError::PathEscape`] rather than silently clamped, since
/// silently clamping would let a guest probe for the root's real depth.
fn normalize_under_root(guest_path: &str, root: &Path) -> Result<PathBuf> {
    let mut stack: Vec<&str> = Vec::new();
    for component in Path::new(guest_path).components() {
        match component {
            Component::RootDir | Component::Prefix(_) => {
                // An absolute guest path is root-relative: a leading `/`
                // just means "start over from the authorized root".
                stack.clear();
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if stack.pop().is_none() {
                    log_then_return!(SandboxError::PathEscape(guest_path.to_string()));
                }
            }
            Component::Normal(seg) => {
                let seg = seg
                    .to_str()
                    .ok_or_else(|| SandboxError::InvalidPath("path segment is not UTF-8".to_string()))?;
                stack.push(seg);
            }
        }
    }

    let mut resolved = root.to_path_buf();
    resolved.extend(stack);
    Ok(resolved)
}
