use crate::host::{host_close, host_open};
use crate::path::resolve_path;
use crate::sandbox::SandboxContext;
use crate::wrappers::{check_vfd, finish, validate_open_flags};
use crate::Result;

/// `open(ctx, gptr_path, flags)` → vfd or `-1`.
///
/// No `mode` argument crosses the guest boundary: `O_CREAT` always creates
/// with `0o666` (matching `wasi_open`/`safe_open`'s own `os_open`/
/// `syscall(SYS_open, ..., NULL)` calls, neither of which threads a
/// guest-supplied mode through).
const DEFAULT_CREATE_MODE: u32 = 0o666;

pub fn open(ctx: &mut SandboxContext, gptr_path: u32, flags: i32) -> i32 {
    let result = open_impl(ctx, gptr_path, flags);
    finish(ctx, "open", result).unwrap_or(-1)
}

fn open_impl(ctx: &mut SandboxContext, gptr_path: u32, flags: i32) -> Result<i32> {
    let flags = validate_open_flags(flags)?;
    let path = resolve_path(ctx.mem(), gptr_path, ctx.authorized_root(), ctx.path_max())?;
    let hfd = host_open(&path, flags, DEFAULT_CREATE_MODE)?;
    match ctx.fds_mut().create_seal(hfd) {
        Ok(vfd) => Ok(vfd),
        Err(e) => {
            // create_seal failed after the host already gave us an fd:
            // close it before surfacing the error so nothing leaks.
            let _ = host_close(hfd);
            Err(e)
        }
    }
}

/// `close(ctx, vfd)` → `0` or `-1`.
///
/// The seal is released before the host primitive runs, so a failure in
/// `host_close` still leaves the fd tables consistent: from the guest's
/// perspective the fd is gone either way.
pub fn close(ctx: &mut SandboxContext, vfd: i32) -> i32 {
    let result = close_impl(ctx, vfd);
    finish(ctx, "close", result).unwrap_or(-1)
}

fn close_impl(ctx: &mut SandboxContext, vfd: i32) -> Result<i32> {
    let hfd = check_vfd(ctx, vfd)?;
    ctx.fds_mut().delete_seal(vfd);
    host_close(hfd)?;
    Ok(0)
}
