use std::cmp::{max, min};
use std::path::{Path, PathBuf};

/// The complete set of configuration needed to create a [`crate::sandbox::SandboxContext`].
///
/// Mirrors the teacher's `SandboxConfiguration` pattern: every field has a
/// documented default, and `new` clamps caller-supplied values into the
/// supported range rather than rejecting them outright.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SandboxConfig {
    /// Length in bytes of the guest's linear memory region.
    pub memlen: usize,
    /// Directory the [`crate::path`] resolver confines all guest paths to.
    /// Every path the guest names must normalize to a descendant of this
    /// root.
    pub authorized_root: PathBuf,
    /// Maximum number of bytes read from guest memory while searching for
    /// a path's NUL terminator.
    pub path_max: usize,
    /// Number of virtual fd slots (`MAX_V` in the spec).
    pub max_virtual_fds: usize,
    /// Number of host fd slots tracked in the reverse map (`MAX_H`).
    pub max_host_fds: usize,
}

impl SandboxConfig {
    /// The minimum linear memory size the spec permits: 1 MiB.
    pub const MIN_MEMLEN: usize = 1024 * 1024;
    /// The maximum linear memory size the spec permits: 4 GiB.
    pub const MAX_MEMLEN: usize = 4 * 1024 * 1024 * 1024;
    /// Default linear memory size when the caller doesn't override it.
    pub const DEFAULT_MEMLEN: usize = Self::MIN_MEMLEN;
    /// `PATH_MAX` as used by the reference sources (`linux/limits.h`).
    pub const DEFAULT_PATH_MAX: usize = 4096;
    /// `MAX_SANDBOX_FDS` in the reference sources.
    pub const DEFAULT_MAX_VIRTUAL_FDS: usize = 8;
    /// `MAX_HOST_FDS` in the reference sources.
    pub const DEFAULT_MAX_HOST_FDS: usize = 1024;

    /// Create a new configuration, clamping `memlen` into
    /// `[MIN_MEMLEN, MAX_MEMLEN]` and defaulting the remaining fields.
    pub fn new(memlen: usize, authorized_root: impl Into<PathBuf>) -> Self {
        Self {
            memlen: min(max(memlen, Self::MIN_MEMLEN), Self::MAX_MEMLEN),
            authorized_root: authorized_root.into(),
            path_max: Self::DEFAULT_PATH_MAX,
            max_virtual_fds: Self::DEFAULT_MAX_VIRTUAL_FDS,
            max_host_fds: Self::DEFAULT_MAX_HOST_FDS,
        }
    }

    /// Override `path_max`, clamping to at least 1 so a resolver can never
    /// be configured into copying zero bytes.
    pub fn with_path_max(mut self, path_max: usize) -> Self {
        self.path_max = max(path_max, 1);
        self
    }

    /// Override the virtual fd table size. Intended for tests that want to
    /// exercise [`crate::fd::FdSealer::create_seal`] exhaustion (scenario 5
    /// in the spec) without opening thousands of files.
    pub fn with_max_virtual_fds(mut self, max_virtual_fds: usize) -> Self {
        self.max_virtual_fds = max(max_virtual_fds, 1);
        self
    }

    /// The authorized root as a `&Path`.
    pub fn root(&self) -> &Path {
        &self.authorized_root
    }
}
