use crate::host::{host_close, host_dup, host_fstat, host_lseek};
use crate::sandbox::SandboxContext;
use crate::wrappers::{check_vfd, finish, validate_whence};
use crate::Result;

/// `fstat(ctx, vfd, statbuf)` → `0` or `-1`. The stat record is built by
/// C6 and copied into guest memory through C2's validated write path, so
/// the wrapper never writes through an unvalidated pointer.
pub fn fstat(ctx: &mut SandboxContext, vfd: i32, gptr_statbuf: u32) -> i32 {
    let result = fstat_impl(ctx, vfd, gptr_statbuf);
    finish(ctx, "fstat", result).unwrap_or(-1)
}

fn fstat_impl(ctx: &mut SandboxContext, vfd: i32, gptr_statbuf: u32) -> Result<i32> {
    let hfd = check_vfd(ctx, vfd)?;
    let st = host_fstat(hfd)?;
    ctx.mem().copy_buf_to_sandbox(gptr_statbuf, st.as_bytes())?;
    Ok(0)
}

/// `lseek(ctx, vfd, offset, whence)` → new position or `-1`.
pub fn lseek(ctx: &mut SandboxContext, vfd: i32, offset: i64, whence: i32) -> i64 {
    let result = lseek_impl(ctx, vfd, offset, whence);
    finish(ctx, "lseek", result).unwrap_or(-1)
}

fn lseek_impl(ctx: &mut SandboxContext, vfd: i32, offset: i64, whence: i32) -> Result<i64> {
    let hfd = check_vfd(ctx, vfd)?;
    let whence = validate_whence(whence)?;
    host_lseek(hfd, offset, whence)
}

/// `dup2(ctx, oldvfd, newvfd)` → `newvfd` or `-1`.
///
/// Resolved Open Question: `newvfd` may already be sealed. Mirroring
/// `dup2(2)`'s implicit close of an open `newfd`, the previous sealing is
/// evicted and its host fd closed before the duplicate takes its place.
/// `oldvfd == newvfd` is a documented no-op (also real `dup2`'s behavior).
pub fn dup2(ctx: &mut SandboxContext, old_vfd: i32, new_vfd: i32) -> i32 {
    let result = dup2_impl(ctx, old_vfd, new_vfd);
    finish(ctx, "dup2", result).unwrap_or(-1)
}

fn dup2_impl(ctx: &mut SandboxContext, old_vfd: i32, new_vfd: i32) -> Result<i32> {
    let old_hfd = check_vfd(ctx, old_vfd)?;
    if !(0..ctx.fds().max_v() as i32).contains(&new_vfd) {
        return Err(crate::SandboxError::BadFd(new_vfd));
    }
    if new_vfd == old_vfd {
        return Ok(new_vfd);
    }

    let new_hfd = host_dup(old_hfd)?;
    match ctx.fds_mut().create_seal_at(new_vfd, new_hfd) {
        Ok(Some(evicted_hfd)) => {
            if let Err(e) = host_close(evicted_hfd) {
                tracing::warn!(
                    vfd = new_vfd,
                    hfd = evicted_hfd,
                    error = %e,
                    "failed to close evicted host fd during dup2"
                );
            }
            Ok(new_vfd)
        }
        Ok(None) => Ok(new_vfd),
        Err(e) => {
            let _ = host_close(new_hfd);
            Err(e)
        }
    }
}
