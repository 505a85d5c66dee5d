//! Shared fixtures for this crate's unit and integration tests: a
//! throwaway authorized root plus a [`crate::sandbox::SandboxContext`]
//! pointed at it, so each test module doesn't hand-roll its own.
//!
//! [`tracing_subscriber`] and [`logger`] are adapted unchanged from the
//! teacher's test harness: a `Subscriber` that records spans/events as
//! JSON for assertions, and a `log::Log` capturing logger for code that
//! still goes through the `log` facade.

pub(crate) mod logger;
pub(crate) mod tracing_subscriber;

use tempfile::TempDir;

use crate::config::SandboxConfig;
use crate::sandbox::SandboxContext;

/// A [`SandboxContext`] backed by a fresh temporary directory. The
/// `TempDir` must be kept alive for as long as the context is in use; it
/// is dropped (and the directory removed) when this struct goes out of
/// scope.
pub(crate) struct TestSandbox {
    pub(crate) ctx: SandboxContext,
    pub(crate) root: TempDir,
}

impl TestSandbox {
    pub(crate) fn new() -> Self {
        Self::with_config(|cfg| cfg)
    }

    pub(crate) fn with_config(f: impl FnOnce(SandboxConfig) -> SandboxConfig) -> Self {
        let root = TempDir::new().expect("failed to create temp dir for test sandbox");
        let cfg = f(SandboxConfig::new(SandboxConfig::DEFAULT_MEMLEN, root.path()));
        let ctx = SandboxContext::create(cfg).expect("failed to create test sandbox context");
        Self { ctx, root }
    }

    /// Write a NUL-terminated path string into guest memory at `gptr`,
    /// the shape every wrapper that resolves a guest path expects.
    pub(crate) fn write_path(&self, gptr: u32, s: &str) {
        let mut bytes = s.as_bytes().to_vec();
        bytes.push(0);
        self.ctx.mem().copy_buf_to_sandbox(gptr, &bytes).unwrap();
    }
}
