use crate::host::{host_read, host_write};
use crate::sandbox::SandboxContext;
use crate::wrappers::{check_vfd, finish};
use crate::Result;

/// `read(ctx, vfd, buf, n)` → bytes read or `-1`.
///
/// Goes through a bounce buffer rather than reading directly into the
/// mapped guest region: [`crate::mem::MemTranslator`] does not expose raw
/// mutable access to guest memory outside its own validated copy methods,
/// and the spec's Non-goals explicitly exclude wrapper-path performance
/// work beyond the bounds checks themselves.
pub fn read(ctx: &mut SandboxContext, vfd: i32, gptr_buf: u32, n: u32) -> i64 {
    let result = read_impl(ctx, vfd, gptr_buf, n);
    finish(ctx, "read", result).unwrap_or(-1)
}

fn read_impl(ctx: &mut SandboxContext, vfd: i32, gptr_buf: u32, n: u32) -> Result<i64> {
    let hfd = check_vfd(ctx, vfd)?;
    let n = n as usize;
    ctx.mem().validate_range(gptr_buf, n)?;
    let mut buf = vec![0u8; n];
    let read_n = host_read(hfd, &mut buf)?;
    ctx.mem().copy_buf_to_sandbox(gptr_buf, &buf[..read_n])?;
    ctx.metrics().bytes_written_total.inc_by(read_n as u64);
    Ok(read_n as i64)
}

/// `write(ctx, vfd, buf, n)` → bytes written or `-1`. Mirror of `read`.
pub fn write(ctx: &mut SandboxContext, vfd: i32, gptr_buf: u32, n: u32) -> i64 {
    let result = write_impl(ctx, vfd, gptr_buf, n);
    finish(ctx, "write", result).unwrap_or(-1)
}

fn write_impl(ctx: &mut SandboxContext, vfd: i32, gptr_buf: u32, n: u32) -> Result<i64> {
    let hfd = check_vfd(ctx, vfd)?;
    let buf = ctx.mem().copy_buf_from_sandbox(gptr_buf, n as usize)?;
    let written = host_write(hfd, &buf)?;
    ctx.metrics().bytes_read_total.inc_by(written as u64);
    Ok(written as i64)
}
