use crate::host::{
    host_chdir, host_getcwd, host_mkdir, host_readlink, host_rmdir, host_symlink, host_unlink,
};
use crate::path::resolve_path;
use crate::sandbox::SandboxContext;
use crate::wrappers::finish;
use crate::{Result, SandboxError};

fn path(ctx: &SandboxContext, gptr: u32) -> Result<std::path::PathBuf> {
    resolve_path(ctx.mem(), gptr, ctx.authorized_root(), ctx.path_max())
}

/// `unlink(ctx, path)` → `0` or `-1`.
pub fn unlink(ctx: &mut SandboxContext, gptr_path: u32) -> i32 {
    let result = unlink_impl(ctx, gptr_path);
    finish(ctx, "unlink", result).unwrap_or(-1)
}

fn unlink_impl(ctx: &mut SandboxContext, gptr_path: u32) -> Result<i32> {
    host_unlink(&path(ctx, gptr_path)?)?;
    Ok(0)
}

/// `symlink(ctx, target, linkpath)` → `0` or `-1`. Both arguments are
/// resolved and confined like any other guest path: a symlink's target
/// is guest-controlled content, and letting it name anything outside the
/// authorized root would reopen the same escape `resolve_path` exists to
/// close for every other operation.
pub fn symlink(ctx: &mut SandboxContext, gptr_target: u32, gptr_linkpath: u32) -> i32 {
    let result = symlink_impl(ctx, gptr_target, gptr_linkpath);
    finish(ctx, "symlink", result).unwrap_or(-1)
}

fn symlink_impl(ctx: &mut SandboxContext, gptr_target: u32, gptr_linkpath: u32) -> Result<i32> {
    let target = path(ctx, gptr_target)?;
    let linkpath = path(ctx, gptr_linkpath)?;
    host_symlink(&target, &linkpath)?;
    Ok(0)
}

/// `readlink(ctx, path, buf, size)` → bytes written or `-1`.
///
/// Resolved Open Question: the output is not null-terminated, matching
/// `readlink(2)` itself — appending one would make confinement checks on
/// a target exactly `size` bytes long ambiguous about whether the buffer
/// was actually big enough.
pub fn readlink(ctx: &mut SandboxContext, gptr_path: u32, gptr_buf: u32, size: u32) -> i64 {
    let result = readlink_impl(ctx, gptr_path, gptr_buf, size);
    finish(ctx, "readlink", result).unwrap_or(-1)
}

fn readlink_impl(ctx: &mut SandboxContext, gptr_path: u32, gptr_buf: u32, size: u32) -> Result<i64> {
    let resolved = path(ctx, gptr_path)?;
    let data = host_readlink(&resolved, size as usize)?;
    ctx.mem().copy_buf_to_sandbox(gptr_buf, &data)?;
    Ok(data.len() as i64)
}

/// `getcwd(ctx, buf, size)` → the `gptr` the null-terminated cwd was
/// written at, or `0` if `size` was too small to hold it. Unlike every
/// other operation in §6, failure here is `0`, not `-1` — there is no
/// `-1` branch in this wrapper's result convention, matching
/// `safe_getcwd`'s `ptr_to_sandbox`-wrapped result in the reference
/// sources.
pub fn getcwd(ctx: &mut SandboxContext, gptr_buf: u32, size: u32) -> u32 {
    let result = getcwd_impl(ctx, gptr_buf, size);
    finish(ctx, "getcwd", result).unwrap_or(0)
}

fn getcwd_impl(ctx: &mut SandboxContext, gptr_buf: u32, size: u32) -> Result<u32> {
    ctx.mem().validate_range(gptr_buf, size as usize)?;
    match host_getcwd(size as usize) {
        Ok(mut cwd) => {
            cwd.push(0);
            ctx.mem().copy_buf_to_sandbox(gptr_buf, &cwd)?;
            Ok(gptr_buf)
        }
        Err(SandboxError::HostError(ref e)) if e.raw_os_error() == Some(libc::ERANGE) => Ok(0),
        Err(e) => Err(e),
    }
}

/// `chdir(ctx, path)` → `0` or `-1`.
pub fn chdir(ctx: &mut SandboxContext, gptr_path: u32) -> i32 {
    let result = chdir_impl(ctx, gptr_path);
    finish(ctx, "chdir", result).unwrap_or(-1)
}

fn chdir_impl(ctx: &mut SandboxContext, gptr_path: u32) -> Result<i32> {
    host_chdir(&path(ctx, gptr_path)?)?;
    Ok(0)
}

/// `mkdir(ctx, path, mode)` → `0` or `-1`.
pub fn mkdir(ctx: &mut SandboxContext, gptr_path: u32, mode: u32) -> i32 {
    let result = mkdir_impl(ctx, gptr_path, mode);
    finish(ctx, "mkdir", result).unwrap_or(-1)
}

fn mkdir_impl(ctx: &mut SandboxContext, gptr_path: u32, mode: u32) -> Result<i32> {
    host_mkdir(&path(ctx, gptr_path)?, mode)?;
    Ok(0)
}

/// `rmdir(ctx, path)` → `0` or `-1`.
pub fn rmdir(ctx: &mut SandboxContext, gptr_path: u32) -> i32 {
    let result = rmdir_impl(ctx, gptr_path);
    finish(ctx, "rmdir", result).unwrap_or(-1)
}

fn rmdir_impl(ctx: &mut SandboxContext, gptr_path: u32) -> Result<i32> {
    host_rmdir(&path(ctx, gptr_path)?)?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SandboxConfig;
    use tempfile::tempdir;

    fn ctx_with_root(root: &std::path::Path) -> SandboxContext {
        SandboxContext::create(SandboxConfig::new(SandboxConfig::DEFAULT_MEMLEN, root)).unwrap()
    }

    fn write_path(ctx: &SandboxContext, gptr: u32, s: &str) {
        let mut bytes = s.as_bytes().to_vec();
        bytes.push(0);
        ctx.mem().copy_buf_to_sandbox(gptr, &bytes).unwrap();
    }

    #[test]
    fn mkdir_then_rmdir_round_trips() {
        let dir = tempdir().unwrap();
        let mut ctx = ctx_with_root(dir.path());
        write_path(&ctx, 0, "sub");
        assert_eq!(mkdir(&mut ctx, 0, 0o755), 0);
        assert!(dir.path().join("sub").is_dir());
        assert_eq!(rmdir(&mut ctx, 0), 0);
        assert!(!dir.path().join("sub").exists());
    }

    #[test]
    fn unlink_removes_a_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), b"x").unwrap();
        let mut ctx = ctx_with_root(dir.path());
        write_path(&ctx, 0, "f.txt");
        assert_eq!(unlink(&mut ctx, 0), 0);
        assert!(!dir.path().join("f.txt").exists());
    }

    #[test]
    fn symlink_and_readlink_round_trip() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("target.txt"), b"x").unwrap();
        let mut ctx = ctx_with_root(dir.path());
        write_path(&ctx, 0, "target.txt");
        write_path(&ctx, 256, "link.txt");
        assert_eq!(symlink(&mut ctx, 0, 256), 0);

        write_path(&ctx, 512, "link.txt");
        let n = readlink(&mut ctx, 512, 1024, 64);
        assert!(n > 0);
    }

    #[test]
    fn getcwd_returns_zero_when_the_buffer_is_too_small() {
        let dir = tempdir().unwrap();
        let mut ctx = ctx_with_root(dir.path());
        assert_eq!(getcwd(&mut ctx, 0, 1), 0);
    }

    #[test]
    fn getcwd_writes_a_nul_terminated_path_on_success() {
        let dir = tempdir().unwrap();
        let mut ctx = ctx_with_root(dir.path());
        let gptr = getcwd(&mut ctx, 0, 4096);
        assert_ne!(gptr, 0);
        let cwd = std::env::current_dir().unwrap();
        let expected_len = cwd.as_os_str().len();
        let out = ctx.mem().copy_buf_from_sandbox(gptr, expected_len + 1).unwrap();
        assert_eq!(out[expected_len], 0);
    }

    #[test]
    fn paths_outside_the_authorized_root_are_rejected() {
        let dir = tempdir().unwrap();
        let mut ctx = ctx_with_root(dir.path());
        write_path(&ctx, 0, "../../etc/shadow");
        assert_eq!(unlink(&mut ctx, 0), -1);
    }
}
