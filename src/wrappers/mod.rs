//! The syscall wrappers (component C5 of the spec): the only guest-visible
//! entry points. Each validates its arguments through C2 ([`crate::mem`]),
//! C3 ([`crate::path`]), and C4 ([`crate::fd`]), calls a C6 host primitive
//! ([`crate::host`]), and collapses the outcome to the guest numeric
//! convention of §6 — a non-negative result, or `-1` (`getcwd` uses `0`
//! instead, see [`paths::getcwd`]).
//!
//! The shape every wrapper follows: validate, translate, call, account,
//! return. None of the internal `*_impl` functions ever runs partway and
//! leaves the fd tables inconsistent — see the per-op comments for the
//! rollback each one performs.

mod io;
mod meta;
mod open_close;
mod paths;

pub use io::{read, write};
pub use meta::{dup2, fstat, lseek};
pub use open_close::{close, open};
pub use paths::{chdir, getcwd, mkdir, readlink, rmdir, symlink, unlink};

use crate::invariant::assert_safe;
use crate::sandbox::SandboxContext;
use crate::{Result, SandboxError};

/// `check_vfd` in the spec's C5 pseudocode: validates `vfd` is in range and
/// currently sealed, returning its host fd.
pub(crate) fn check_vfd(ctx: &SandboxContext, vfd: i32) -> Result<i32> {
    if !ctx.fds().in_fd_map(vfd) {
        return Err(SandboxError::BadFd(vfd));
    }
    Ok(ctx.fds().translate(vfd))
}

/// Only `O_RDONLY`/`O_WRONLY`/`O_RDWR` (the access-mode bits), `O_CREAT`,
/// `O_EXCL`, `O_TRUNC`, and `O_APPEND` are recognized; any other bit fails
/// the call. `O_RDONLY` is `0` in the POSIX convention this crate targets,
/// so a guest that sets none of the three access-mode bits is requesting
/// read-only access, not an invalid mode — there is no separate "no mode"
/// case to reject.
pub(crate) fn validate_open_flags(flags: i32) -> Result<i32> {
    let recognized = libc::O_ACCMODE | libc::O_CREAT | libc::O_EXCL | libc::O_TRUNC | libc::O_APPEND;
    if flags & !recognized != 0 {
        return Err(SandboxError::Other(format!(
            "open flags {flags:#x} contain unrecognized bits (allowed mask {recognized:#x})"
        )));
    }
    Ok(flags)
}

/// Only `SEEK_SET`, `SEEK_CUR`, and `SEEK_END` are accepted; any other
/// value is classified as a host error per §7/§6, since from the guest's
/// perspective it is indistinguishable from the underlying `lseek(2)`
/// rejecting an invalid `whence`.
pub(crate) fn validate_whence(whence: i32) -> Result<i32> {
    if matches!(whence, libc::SEEK_SET | libc::SEEK_CUR | libc::SEEK_END) {
        Ok(whence)
    } else {
        Err(std::io::Error::from_raw_os_error(libc::EINVAL).into())
    }
}

/// Common bookkeeping every wrapper performs on its way out: count the
/// call, count and log a failure, then hand the result back unchanged so
/// callers can still match on the concrete error type in tests.
///
/// C7's monitor runs here as the entry/exit checkpoint the spec's data
/// flow calls for (§2: "C7's predicates are evaluated before entry and
/// after exit ... by assertions in testing builds"): by the time a
/// wrapper's `*_impl` has returned, whatever it did to the fd tables is
/// already committed, so checking immediately before and after that
/// commit point catches a violation at the same place whether the impl
/// is about to run or has just finished.
pub(crate) fn finish<T>(ctx: &SandboxContext, op: &'static str, result: Result<T>) -> Result<T> {
    debug_assert!(assert_safe(ctx, None, None), "{op}: safety invariant violated before finish");
    ctx.metrics().syscalls_total.inc();
    if let Err(ref e) = result {
        ctx.metrics().syscall_errors_total.inc();
        tracing::warn!(op, error = %e, "wrapper returning error");
    }
    debug_assert!(assert_safe(ctx, None, None), "{op}: safety invariant violated after finish");
    result
}
